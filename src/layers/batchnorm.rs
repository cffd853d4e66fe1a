//! Batch normalization layer implementation
//!
//! This module provides a BatchNormLayer that standardizes activations across the batch
//! dimension.
//!
//! # Batch Normalization Theory
//!
//! 1. Compute batch statistics: mean μ and variance σ² of each feature across the batch
//! 2. Normalize: x̂ = (x - μ) / sqrt(σ² + ε)
//!
//! This layer has no learnable scale or shift: its output is x̂ itself (equivalent to
//! fixing γ = 1, β = 0 in the usual formulation).
//!
//! During training, batch statistics are used and running statistics are updated by an
//! exponential moving average. During inference, the running statistics are used instead
//! and nothing is mutated.
//!
//! # References
//!
//! Ioffe, S., & Szegedy, C. (2015). Batch Normalization: Accelerating Deep Network Training
//! by Reducing Internal Covariate Shift. ICML.

use crate::error::{Error, Result};
use crate::layers::{Layer, Mode};
use crate::utils::Matrix;

/// Default momentum for the running statistics.
pub const DEFAULT_MOMENTUM: f64 = 0.9;
/// Default epsilon added to the variance.
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// Batch normalization layer without learnable parameters.
///
/// # Fields
///
/// * `size` - Number of input/output features (batch norm doesn't change dimensions)
/// * `epsilon` - Small constant for numerical stability (prevents division by zero)
/// * `momentum` - Weight of the old value in the running-statistics update
/// * `running_mean` - Running average of means (for inference), starts at 0
/// * `running_var` - Running average of variances (for inference), starts at 1
/// * `cache` - Values from the last training-mode forward pass
///
/// # Example
///
/// ```
/// use layerstack::layers::{BatchNormLayer, Layer, Mode};
/// use layerstack::utils::Matrix;
///
/// let mut layer = BatchNormLayer::new(2);
/// let input = Matrix::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
/// let output = layer.forward(&input, Mode::Train).unwrap();
/// assert!((output.get(0, 0) + 1.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct BatchNormLayer {
    size: usize,
    epsilon: f64,
    momentum: f64,
    running_mean: Vec<f64>,
    running_var: Vec<f64>,
    cache: Option<BatchNormCache>,
}

#[derive(Debug, Clone)]
struct BatchNormCache {
    input: Matrix,
    normalized: Matrix,
    mean: Vec<f64>,
    var: Vec<f64>,
}

impl BatchNormLayer {
    /// Batch norm over `size` features with default momentum (0.9) and epsilon (1e-5).
    pub fn new(size: usize) -> Self {
        Self {
            size,
            epsilon: DEFAULT_EPSILON,
            momentum: DEFAULT_MOMENTUM,
            running_mean: vec![0.0; size],
            running_var: vec![1.0; size],
            cache: None,
        }
    }

    /// Batch norm with explicit hyperparameters.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `epsilon <= 0` or `momentum` is outside [0.0, 1.0].
    pub fn with_params(size: usize, epsilon: f64, momentum: f64) -> Result<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(Error::InvalidConfig("epsilon must be positive".into()));
        }
        if !(0.0..=1.0).contains(&momentum) {
            return Err(Error::InvalidConfig(
                "momentum must be in range [0.0, 1.0]".into(),
            ));
        }

        Ok(Self {
            epsilon,
            momentum,
            ..Self::new(size)
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Running mean per feature (used during inference).
    pub fn running_mean(&self) -> &[f64] {
        &self.running_mean
    }

    /// Running variance per feature (used during inference).
    pub fn running_var(&self) -> &[f64] {
        &self.running_var
    }

    /// Overwrite the running statistics.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if either vector is not `size` long, `InvalidConfig` if a mean is
    /// not finite or a variance is negative or not finite.
    pub fn set_running_stats(&mut self, mean: Vec<f64>, var: Vec<f64>) -> Result<()> {
        if mean.len() != self.size || var.len() != self.size {
            return Err(Error::shape(
                "batch norm running statistics",
                format!("{} values", self.size),
                format!("{} mean / {} var values", mean.len(), var.len()),
            ));
        }
        if let Some(m) = mean.iter().find(|m| !m.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "running mean must be finite, got {}",
                m
            )));
        }
        if let Some(v) = var.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(Error::InvalidConfig(format!(
                "running variance must be finite and >= 0, got {}",
                v
            )));
        }
        self.running_mean = mean;
        self.running_var = var;
        Ok(())
    }

    fn check_input(&self, input: &Matrix) -> Result<()> {
        if input.cols() != self.size {
            return Err(Error::shape(
                "batch norm forward input",
                format!("{} columns", self.size),
                format!("{} columns", input.cols()),
            ));
        }
        Ok(())
    }

    fn forward_train(&mut self, input: &Matrix) -> Result<Matrix> {
        if input.rows() == 0 {
            return Err(Error::InvalidData(
                "batch norm cannot compute statistics of an empty batch".into(),
            ));
        }

        let batch_size = input.rows() as f64;
        let mean = input.column_means();
        let mut var = vec![0.0; self.size];
        for row in input.iter_rows() {
            for ((v, &x), &m) in var.iter_mut().zip(row).zip(&mean) {
                let diff = x - m;
                *v += diff * diff;
            }
        }
        var.iter_mut().for_each(|v| *v /= batch_size);

        let inv_std: Vec<f64> = var.iter().map(|&v| 1.0 / (v + self.epsilon).sqrt()).collect();
        let mut normalized = input.clone();
        for i in 0..normalized.rows() {
            for (j, value) in normalized.row_mut(i).iter_mut().enumerate() {
                *value = (*value - mean[j]) * inv_std[j];
            }
        }

        // running = momentum * running + (1 - momentum) * batch
        for j in 0..self.size {
            self.running_mean[j] =
                self.momentum * self.running_mean[j] + (1.0 - self.momentum) * mean[j];
            self.running_var[j] =
                self.momentum * self.running_var[j] + (1.0 - self.momentum) * var[j];
        }

        self.cache = Some(BatchNormCache {
            input: input.clone(),
            normalized: normalized.clone(),
            mean,
            var,
        });
        Ok(normalized)
    }

    fn forward_inference(&mut self, input: &Matrix) -> Matrix {
        // An evaluation pass must not be differentiated.
        self.cache = None;

        let inv_std: Vec<f64> = self
            .running_var
            .iter()
            .map(|&v| 1.0 / (v + self.epsilon).sqrt())
            .collect();
        let mut output = input.clone();
        for i in 0..output.rows() {
            for (j, value) in output.row_mut(i).iter_mut().enumerate() {
                *value = (*value - self.running_mean[j]) * inv_std[j];
            }
        }
        output
    }

    /// Batch mean and variance captured by the last training-mode forward pass.
    pub fn batch_statistics(&self) -> Option<(&[f64], &[f64])> {
        self.cache
            .as_ref()
            .map(|c| (c.mean.as_slice(), c.var.as_slice()))
    }
}

impl Layer for BatchNormLayer {
    fn forward(&mut self, input: &Matrix, mode: Mode) -> Result<Matrix> {
        self.check_input(input)?;
        match mode {
            Mode::Train => self.forward_train(input),
            Mode::Inference => Ok(self.forward_inference(input)),
        }
    }

    /// Full batch-norm gradient through the batch mean and variance:
    ///
    /// dx = (N·dx̂ − Σdx̂ − x̂·Σ(dx̂⊙x̂)) / (N·sqrt(σ² + ε))
    ///
    /// computed per feature, sums taken over the batch.
    fn backward(&mut self, grad_output: &Matrix, _learning_rate: f64) -> Result<Matrix> {
        self.check_backward(grad_output.shape())?;
        let cache = self.cache.as_ref().ok_or_else(|| {
            Error::InvalidState("batch norm backward requires a preceding training forward".into())
        })?;

        let batch_size = grad_output.rows();
        let n = batch_size as f64;

        let sum_grad = grad_output.column_sums();
        let mut sum_grad_norm = vec![0.0; self.size];
        for i in 0..batch_size {
            for ((acc, &g), &xh) in sum_grad_norm
                .iter_mut()
                .zip(grad_output.row(i))
                .zip(cache.normalized.row(i))
            {
                *acc += g * xh;
            }
        }

        let mut grad_input = Matrix::zeros(batch_size, self.size);
        for i in 0..batch_size {
            let g = grad_output.row(i);
            let xh = cache.normalized.row(i);
            for (j, dx) in grad_input.row_mut(i).iter_mut().enumerate() {
                let inv_std = 1.0 / (cache.var[j] + self.epsilon).sqrt();
                *dx = inv_std / n * (n * g[j] - sum_grad[j] - xh[j] * sum_grad_norm[j]);
            }
        }
        Ok(grad_input)
    }

    fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            Error::InvalidState("batch norm backward requires a preceding training forward".into())
        })?;
        let expected = (cache.input.rows(), self.size);
        if grad_shape != expected {
            return Err(Error::shape(
                "batch norm backward gradient",
                format!("{:?}", expected),
                format!("{:?}", grad_shape),
            ));
        }
        Ok(expected)
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    /// Running statistics are not trainable, and there is no γ/β.
    fn parameter_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "batchnorm"
    }
}
