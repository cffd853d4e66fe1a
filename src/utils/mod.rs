//! Shared utilities for the training engine
//!
//! This module provides the batch container, the seeded random number generator
//! and the activation catalog used by the layers.

pub mod activations;
pub mod matrix;
pub mod rng;

pub use activations::Activation;
pub use matrix::Matrix;
pub use rng::SimpleRng;
