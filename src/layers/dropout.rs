//! Dropout layer implementation for regularization
//!
//! This module provides a DropoutLayer that keeps each input unit with probability
//! `keep_prob` during training (zeroing the rest) and rescales the kept units by
//! 1/keep_prob (inverted dropout), so inference is a plain passthrough.

use crate::error::{Error, Result};
use crate::layers::{Layer, Mode};
use crate::utils::{Matrix, SimpleRng};

/// Dropout layer for regularization.
///
/// # Fields
///
/// * `size` - Number of input/output features (dropout doesn't change dimensions)
/// * `keep_prob` - Probability of keeping each unit, in (0.0, 1.0]
/// * `seed` - Seed the generator was created from
/// * `rng` - Generator owned by this layer; a fresh mask is drawn on every training forward
/// * `mask` - Keep mask (1.0 kept / 0.0 dropped) of the last training forward
///
/// # Example
///
/// ```
/// use layerstack::layers::{DropoutLayer, Layer, Mode};
/// use layerstack::utils::Matrix;
///
/// let mut layer = DropoutLayer::new(4, 0.5, 42).unwrap();
/// let input = Matrix::from_rows(&[vec![1.0; 4]]).unwrap();
/// let output = layer.forward(&input, Mode::Inference).unwrap();
/// assert_eq!(output, input);
/// ```
#[derive(Debug, Clone)]
pub struct DropoutLayer {
    size: usize,
    keep_prob: f64,
    seed: u64,
    rng: SimpleRng,
    mask: Option<Matrix>,
}

impl DropoutLayer {
    /// Creates a new dropout layer.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `keep_prob` is not in (0.0, 1.0].
    pub fn new(size: usize, keep_prob: f64, seed: u64) -> Result<Self> {
        if !(keep_prob > 0.0 && keep_prob <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "keep_prob must be in range (0.0, 1.0], got {}",
                keep_prob
            )));
        }

        Ok(Self {
            size,
            keep_prob,
            seed,
            rng: SimpleRng::new(seed),
            mask: None,
        })
    }

    pub fn keep_prob(&self) -> f64 {
        self.keep_prob
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Mask drawn by the last training-mode forward pass, if any.
    pub fn mask(&self) -> Option<&Matrix> {
        self.mask.as_ref()
    }
}

impl Layer for DropoutLayer {
    fn forward(&mut self, input: &Matrix, mode: Mode) -> Result<Matrix> {
        if input.cols() != self.size {
            return Err(Error::shape(
                "dropout forward input",
                format!("{} columns", self.size),
                format!("{} columns", input.cols()),
            ));
        }

        if !mode.is_train() {
            self.mask = None;
            return Ok(input.clone());
        }

        let scale = 1.0 / self.keep_prob;
        let mut mask = Matrix::zeros(input.rows(), input.cols());
        let mut output = input.clone();
        for (m, out) in mask
            .as_mut_slice()
            .iter_mut()
            .zip(output.as_mut_slice().iter_mut())
        {
            if self.rng.bernoulli(self.keep_prob) {
                *m = 1.0;
                *out *= scale;
            } else {
                *out = 0.0;
            }
        }
        self.mask = Some(mask);
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Matrix, _learning_rate: f64) -> Result<Matrix> {
        self.check_backward(grad_output.shape())?;
        let mask = self.mask.as_ref().ok_or_else(|| {
            Error::InvalidState("dropout backward requires a preceding training forward".into())
        })?;

        let scale = 1.0 / self.keep_prob;
        let mut grad_input = grad_output.clone();
        for (g, &m) in grad_input.as_mut_slice().iter_mut().zip(mask.as_slice()) {
            *g *= m * scale;
        }
        Ok(grad_input)
    }

    fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)> {
        let mask = self.mask.as_ref().ok_or_else(|| {
            Error::InvalidState("dropout backward requires a preceding training forward".into())
        })?;
        if grad_shape != mask.shape() {
            return Err(Error::shape(
                "dropout backward gradient",
                format!("{:?}", mask.shape()),
                format!("{:?}", grad_shape),
            ));
        }
        Ok(grad_shape)
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    /// Dropout has no trainable parameters.
    fn parameter_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "dropout"
    }
}
