//! Layer abstractions for neural networks
//!
//! This module provides the [`Layer`] trait, the execution [`Mode`], the three layer
//! implementations and [`LayerKind`], the closed set of layers a model is built from.

mod r#trait;
pub mod batchnorm;
pub mod dense;
pub mod dropout;

pub use batchnorm::BatchNormLayer;
pub use dense::{DenseGradients, DenseLayer};
pub use dropout::DropoutLayer;
pub use r#trait::{Layer, Mode};

use crate::error::Result;
use crate::utils::Matrix;

/// One layer of a model.
///
/// Dispatch goes through the [`Layer`] implementation below; adding a layer kind means
/// adding a variant here, nothing in the model or trainer changes.
#[derive(Debug, Clone)]
pub enum LayerKind {
    Dense(DenseLayer),
    BatchNorm(BatchNormLayer),
    Dropout(DropoutLayer),
}

macro_rules! dispatch {
    ($self:ident, $layer:ident => $body:expr) => {
        match $self {
            LayerKind::Dense($layer) => $body,
            LayerKind::BatchNorm($layer) => $body,
            LayerKind::Dropout($layer) => $body,
        }
    };
}

impl Layer for LayerKind {
    fn forward(&mut self, input: &Matrix, mode: Mode) -> Result<Matrix> {
        dispatch!(self, layer => layer.forward(input, mode))
    }

    fn backward(&mut self, grad_output: &Matrix, learning_rate: f64) -> Result<Matrix> {
        dispatch!(self, layer => layer.backward(grad_output, learning_rate))
    }

    fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)> {
        dispatch!(self, layer => layer.check_backward(grad_shape))
    }

    fn input_size(&self) -> usize {
        dispatch!(self, layer => layer.input_size())
    }

    fn output_size(&self) -> usize {
        dispatch!(self, layer => layer.output_size())
    }

    fn parameter_count(&self) -> usize {
        dispatch!(self, layer => layer.parameter_count())
    }

    fn name(&self) -> &'static str {
        dispatch!(self, layer => layer.name())
    }
}

impl LayerKind {
    pub fn as_dense(&self) -> Option<&DenseLayer> {
        match self {
            LayerKind::Dense(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_dense_mut(&mut self) -> Option<&mut DenseLayer> {
        match self {
            LayerKind::Dense(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_batch_norm(&self) -> Option<&BatchNormLayer> {
        match self {
            LayerKind::BatchNorm(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_batch_norm_mut(&mut self) -> Option<&mut BatchNormLayer> {
        match self {
            LayerKind::BatchNorm(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_dropout(&self) -> Option<&DropoutLayer> {
        match self {
            LayerKind::Dropout(layer) => Some(layer),
            _ => None,
        }
    }
}

impl From<DenseLayer> for LayerKind {
    fn from(layer: DenseLayer) -> Self {
        LayerKind::Dense(layer)
    }
}

impl From<BatchNormLayer> for LayerKind {
    fn from(layer: BatchNormLayer) -> Self {
        LayerKind::BatchNorm(layer)
    }
}

impl From<DropoutLayer> for LayerKind {
    fn from(layer: DropoutLayer) -> Self {
        LayerKind::Dropout(layer)
    }
}
