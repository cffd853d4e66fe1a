//! Configuration structures for training
//!
//! This module provides the training configuration (epochs, learning rate, mini-batch
//! size, optional shuffle seed) and its JSON loader.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_batch_size() -> usize {
    32
}

/// Configuration for a training run.
///
/// # Example
///
/// ```json
/// {
///   "epochs": 5000,
///   "learning_rate": 0.01,
///   "batch_size": 20,
///   "shuffle_seed": 7
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the dataset
    pub epochs: usize,

    /// SGD step size applied by every parametric layer
    pub learning_rate: f64,

    /// Mini-batch size (default 32); the last batch of an epoch may be smaller
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seed for per-epoch shuffling; samples are visited in order when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl TrainingConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: TrainingConfig = serde_json::from_str(contents)?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Loads a training configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use layerstack::config::load_config;
///
/// let cfg = load_config("config/sine_training.json").unwrap();
/// assert!(cfg.epochs > 0);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    TrainingConfig::from_json(&contents)
}

fn validate_config(config: &TrainingConfig) -> Result<()> {
    if config.epochs == 0 {
        return Err(Error::InvalidConfig("epochs must be greater than 0".into()));
    }
    if !(config.learning_rate.is_finite() && config.learning_rate > 0.0) {
        return Err(Error::InvalidConfig(
            "learning_rate must be finite and positive".into(),
        ));
    }
    if config.batch_size == 0 {
        return Err(Error::InvalidConfig(
            "batch_size must be greater than 0".into(),
        ));
    }
    Ok(())
}
