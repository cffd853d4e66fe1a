//! Architecture configuration structures
//!
//! This module describes a layer stack in JSON and builds a [`Model`] from it, so
//! architectures can be changed without code changes.

use crate::error::{Error, Result};
use crate::layers::batchnorm::{DEFAULT_EPSILON, DEFAULT_MOMENTUM};
use crate::layers::{BatchNormLayer, DenseLayer, DropoutLayer, LayerKind};
use crate::model::Model;
use crate::utils::{Activation, SimpleRng};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration for a single layer in the network.
///
/// Different layer types require different fields:
///
/// - **Dense**: requires `input_size`, `output_size`; optional `activation`
///   (default "identity") and `leaky_relu_alpha`
/// - **BatchNorm**: requires `size`; optional `epsilon` (default 1e-5), `momentum` (default 0.9)
/// - **Dropout**: requires `size` and `keep_prob` (in (0.0, 1.0]); optional `seed`
///
/// # Examples
///
/// ```json
/// { "layer_type": "dense", "input_size": 1, "output_size": 20, "activation": "relu" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "dense", "batchnorm" or "dropout"
    pub layer_type: String,

    // Dense layer parameters
    pub input_size: Option<usize>,
    pub output_size: Option<usize>,
    /// Activation name: identity, sigmoid, relu, leaky_relu, softplus, binary_step
    pub activation: Option<String>,
    pub leaky_relu_alpha: Option<f64>,

    // BatchNorm and Dropout share `size`
    pub size: Option<usize>,
    pub epsilon: Option<f64>,
    pub momentum: Option<f64>,

    // Dropout layer parameters
    /// Probability of keeping a unit
    pub keep_prob: Option<f64>,
    /// Mask seed; derived from the architecture seed when absent
    pub seed: Option<u64>,
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "seed": 42,
///   "layers": [
///     { "layer_type": "dense", "input_size": 1, "output_size": 20, "activation": "relu" },
///     { "layer_type": "batchnorm", "size": 20 },
///     { "layer_type": "dropout", "size": 20, "keep_prob": 0.9 },
///     { "layer_type": "dense", "input_size": 20, "output_size": 1 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchitectureConfig {
    /// Seed for weight initialization (and derived dropout seeds)
    #[serde(default)]
    pub seed: u64,
    /// Layers in application order
    pub layers: Vec<LayerConfig>,
}

impl ArchitectureConfig {
    /// Parse and validate an architecture from a JSON string.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: ArchitectureConfig = serde_json::from_str(contents)?;
        validate_architecture(&config)?;
        Ok(config)
    }
}

/// Loads an architecture configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use layerstack::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/sine_mlp.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: impl AsRef<Path>) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path)?;
    ArchitectureConfig::from_json(&contents)
}

fn require<T: Copy>(value: Option<T>, index: usize, kind: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| {
        Error::InvalidConfig(format!(
            "Layer {}: {} layer requires '{}'",
            index, kind, field
        ))
    })
}

fn require_positive(value: Option<usize>, index: usize, kind: &str, field: &str) -> Result<usize> {
    let value = require(value, index, kind, field)?;
    if value == 0 {
        return Err(Error::InvalidConfig(format!(
            "Layer {}: {} must be greater than 0",
            index, field
        )));
    }
    Ok(value)
}

fn layer_activation(layer: &LayerConfig, index: usize) -> Result<Activation> {
    let name = layer.activation.as_deref().unwrap_or("identity");
    let activation = match name.parse::<Activation>() {
        Ok(Activation::LeakyReLU { alpha }) => Activation::LeakyReLU {
            alpha: layer.leaky_relu_alpha.unwrap_or(alpha),
        },
        Ok(activation) => activation,
        Err(err) => return Err(Error::InvalidConfig(format!("Layer {}: {}", index, err))),
    };
    activation
        .validate()
        .map_err(|err| Error::InvalidConfig(format!("Layer {}: {}", index, err)))?;
    Ok(activation)
}

/// Input and output widths of a validated layer.
fn layer_widths(layer: &LayerConfig, index: usize) -> Result<(usize, usize)> {
    match layer.layer_type.to_lowercase().as_str() {
        "dense" => {
            let input_size = require_positive(layer.input_size, index, "Dense", "input_size")?;
            let output_size = require_positive(layer.output_size, index, "Dense", "output_size")?;
            layer_activation(layer, index)?;
            Ok((input_size, output_size))
        }
        "batchnorm" => {
            let size = require_positive(layer.size, index, "BatchNorm", "size")?;
            if let Some(epsilon) = layer.epsilon {
                if !(epsilon > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "Layer {}: epsilon must be positive",
                        index
                    )));
                }
            }
            if let Some(momentum) = layer.momentum {
                if !(0.0..=1.0).contains(&momentum) {
                    return Err(Error::InvalidConfig(format!(
                        "Layer {}: momentum must be in range [0.0, 1.0]",
                        index
                    )));
                }
            }
            Ok((size, size))
        }
        "dropout" => {
            let size = require_positive(layer.size, index, "Dropout", "size")?;
            let keep_prob = require(layer.keep_prob, index, "Dropout", "keep_prob")?;
            if !(keep_prob > 0.0 && keep_prob <= 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "Layer {}: keep_prob must be in range (0.0, 1.0]",
                    index
                )));
            }
            Ok((size, size))
        }
        _ => Err(Error::InvalidConfig(format!(
            "Layer {}: Invalid layer type '{}'. Must be one of: dense, batchnorm, dropout",
            index, layer.layer_type
        ))),
    }
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Each layer has the required fields for its type, within valid ranges
/// - Output size of layer i matches input size of layer i+1
fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    if config.layers.is_empty() {
        return Err(Error::InvalidConfig(
            "Architecture must have at least one layer".into(),
        ));
    }

    let widths = config
        .layers
        .iter()
        .enumerate()
        .map(|(i, layer)| layer_widths(layer, i))
        .collect::<Result<Vec<_>>>()?;

    for (i, pair) in widths.windows(2).enumerate() {
        let (current_output, next_input) = (pair[0].1, pair[1].0);
        if current_output != next_input {
            return Err(Error::InvalidConfig(format!(
                "Layer connection mismatch: Layer {} output size ({}) does not match Layer {} input size ({})",
                i,
                current_output,
                i + 1,
                next_input
            )));
        }
    }

    Ok(())
}

/// Seed for a dropout layer without an explicit one.
fn derived_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64 + 1).wrapping_mul(0x9e3779b97f4a7c15)
}

/// Builds a model from an architecture configuration.
///
/// Dense weights are drawn in layer order from one generator seeded with
/// `config.seed`, so the same configuration always yields the same model.
///
/// # Examples
///
/// ```
/// use layerstack::architecture::{build_model, ArchitectureConfig};
///
/// let config = ArchitectureConfig::from_json(r#"{
///   "seed": 1,
///   "layers": [
///     { "layer_type": "dense", "input_size": 2, "output_size": 3, "activation": "sigmoid" },
///     { "layer_type": "dense", "input_size": 3, "output_size": 1 }
///   ]
/// }"#).unwrap();
/// let model = build_model(&config).unwrap();
/// assert_eq!(model.layers().len(), 2);
/// ```
pub fn build_model(config: &ArchitectureConfig) -> Result<Model> {
    validate_architecture(config)?;

    let mut rng = SimpleRng::new(config.seed);
    let mut layers: Vec<LayerKind> = Vec::with_capacity(config.layers.len());

    for (i, layer_config) in config.layers.iter().enumerate() {
        let (input_size, output_size) = layer_widths(layer_config, i)?;
        let layer = match layer_config.layer_type.to_lowercase().as_str() {
            "dense" => {
                let activation = layer_activation(layer_config, i)?;
                DenseLayer::new(input_size, output_size, activation, &mut rng)?.into()
            }
            "batchnorm" => BatchNormLayer::with_params(
                input_size,
                layer_config.epsilon.unwrap_or(DEFAULT_EPSILON),
                layer_config.momentum.unwrap_or(DEFAULT_MOMENTUM),
            )?
            .into(),
            "dropout" => {
                let seed = layer_config
                    .seed
                    .unwrap_or_else(|| derived_seed(config.seed, i));
                let keep_prob = require(layer_config.keep_prob, i, "Dropout", "keep_prob")?;
                DropoutLayer::new(input_size, keep_prob, seed)?.into()
            }
            other => {
                return Err(Error::InvalidConfig(format!(
                    "Layer {}: Invalid layer type '{}'",
                    i, other
                )))
            }
        };
        layers.push(layer);
    }

    Model::new(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;

    fn dense(input_size: usize, output_size: usize) -> LayerConfig {
        LayerConfig {
            layer_type: "dense".into(),
            input_size: Some(input_size),
            output_size: Some(output_size),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_empty() {
        let config = ArchitectureConfig::default();
        assert!(validate_architecture(&config).is_err());
    }

    #[test]
    fn test_validate_connection_mismatch() {
        let config = ArchitectureConfig {
            seed: 0,
            layers: vec![dense(2, 3), dense(4, 1)],
        };
        let err = validate_architecture(&config).unwrap_err();
        assert!(err.to_string().contains("Layer connection mismatch"));
    }

    #[test]
    fn test_default_activation_is_identity() {
        let config = ArchitectureConfig {
            seed: 0,
            layers: vec![dense(2, 1)],
        };
        let model = build_model(&config).unwrap();
        let layer = model.layers()[0].as_dense().unwrap();
        assert_eq!(layer.activation(), Activation::Identity);
    }

    #[test]
    fn test_leaky_alpha_override() {
        let mut layer = dense(2, 2);
        layer.activation = Some("leaky_relu".into());
        layer.leaky_relu_alpha = Some(0.2);
        assert_eq!(
            layer_activation(&layer, 0).unwrap(),
            Activation::LeakyReLU { alpha: 0.2 }
        );

        layer.leaky_relu_alpha = Some(-1.0);
        assert!(layer_activation(&layer, 0).is_err());
    }

    #[test]
    fn test_derived_dropout_seeds_differ() {
        let dropout = |seed: Option<u64>| LayerConfig {
            layer_type: "dropout".into(),
            size: Some(3),
            keep_prob: Some(0.5),
            seed,
            ..Default::default()
        };
        let config = ArchitectureConfig {
            seed: 42,
            layers: vec![dropout(None), dropout(None), dropout(Some(7))],
        };
        let model = build_model(&config).unwrap();
        let seeds: Vec<u64> = model
            .layers()
            .iter()
            .map(|l| l.as_dropout().unwrap().seed())
            .collect();
        assert_ne!(seeds[0], seeds[1]);
        assert_eq!(seeds[2], 7);
        assert_eq!(model.layers()[0].output_size(), 3);
    }
}
