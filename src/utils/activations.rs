//! Activation functions for dense layers
//!
//! A dense layer computes `z = W x + b` and applies an activation element-wise.
//! Each activation exposes its value `f(z)` and derivative `f'(z)`, both expressed
//! in terms of the pre-activation `z`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default negative slope for [`Activation::LeakyReLU`].
pub const DEFAULT_LEAKY_RELU_ALPHA: f64 = 0.01;

/// Element-wise activation function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leaky_relu")]
    LeakyReLU { alpha: f64 },
    Softplus,
    /// Heaviside step. Not differentiable: its derivative is reported as 0, so a
    /// trainable layer using it never updates through it.
    BinaryStep,
}

impl Activation {
    /// Leaky ReLU with the default slope.
    pub fn leaky_relu() -> Self {
        Activation::LeakyReLU {
            alpha: DEFAULT_LEAKY_RELU_ALPHA,
        }
    }

    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        if let Activation::LeakyReLU { alpha } = self {
            if !(alpha.is_finite() && alpha >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                )));
            }
        }
        Ok(())
    }

    /// `f(z)`.
    #[inline]
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Identity => z,
            Activation::Sigmoid => sigmoid(z),
            Activation::ReLU => z.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    z
                } else {
                    alpha * z
                }
            }
            Activation::Softplus => softplus(z),
            Activation::BinaryStep => {
                if z >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// `f'(z)`.
    #[inline]
    pub fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Sigmoid => {
                let s = sigmoid(z);
                s * (1.0 - s)
            }
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Softplus => sigmoid(z),
            Activation::BinaryStep => 0.0,
        }
    }

    /// Lowercase name as used in architecture files.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::ReLU => "relu",
            Activation::LeakyReLU { .. } => "leaky_relu",
            Activation::Softplus => "softplus",
            Activation::BinaryStep => "binary_step",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::LeakyReLU { alpha } => write!(f, "leaky_relu({alpha})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Activation {
    type Err = Error;

    /// Parse a lowercase activation name. `leaky_relu` gets the default slope.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "identity" | "linear" => Ok(Activation::Identity),
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::ReLU),
            "leaky_relu" => Ok(Activation::leaky_relu()),
            "softplus" => Ok(Activation::Softplus),
            "binary_step" => Ok(Activation::BinaryStep),
            other => Err(Error::InvalidConfig(format!(
                "Invalid activation function '{}'. Must be one of: identity, sigmoid, relu, leaky_relu, softplus, binary_step",
                other
            ))),
        }
    }
}

/// Numerically stable sigmoid.
#[inline]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable softplus: `ln(1 + e^z) = max(z, 0) + ln(1 + e^-|z|)`.
#[inline]
pub fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}
