//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that all layer types implement, and the
//! execution [`Mode`] every forward call receives.

use crate::error::Result;
use crate::utils::Matrix;

/// Model-wide execution mode.
///
/// `Train` is stochastic and statistic-updating (dropout draws masks, batch norm uses
/// and accumulates batch statistics). `Inference` is deterministic and statistic-frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Train,
    #[default]
    Inference,
}

impl Mode {
    pub fn is_train(self) -> bool {
        self == Mode::Train
    }
}

/// Core trait for neural network layers.
///
/// All layer types (Dense, BatchNorm, Dropout) implement this trait to provide a uniform
/// interface for forward and backward propagation. Batches are [`Matrix`] values with
/// one sample per row.
///
/// # Example
///
/// ```
/// use layerstack::layers::{DenseLayer, Layer, Mode};
/// use layerstack::utils::{Activation, Matrix, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DenseLayer::new(3, 2, Activation::ReLU, &mut rng).unwrap();
/// let input = Matrix::from_rows(&[vec![0.1, 0.2, 0.3]]).unwrap();
///
/// let output = layer.forward(&input, Mode::Train).unwrap();
/// assert_eq!(output.shape(), (1, 2));
///
/// let grad_output = Matrix::from_rows(&[vec![1.0, -1.0]]).unwrap();
/// let grad_input = layer.backward(&grad_output, 0.01).unwrap();
/// assert_eq!(grad_input.shape(), (1, 3));
/// ```
pub trait Layer {
    /// Forward propagation through the layer.
    ///
    /// Computes the layer output for a batch (`batch_size × input_size`) and caches
    /// whatever the following `backward` call needs.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the input width differs from [`Layer::input_size`].
    fn forward(&mut self, input: &Matrix, mode: Mode) -> Result<Matrix>;

    /// Backward propagation through the layer.
    ///
    /// Given the gradient of the loss w.r.t. this layer's output from the most recent
    /// forward call, returns the gradient w.r.t. its input. Parametric layers apply
    /// their own SGD step with `learning_rate` as part of this call.
    ///
    /// # Errors
    ///
    /// - `InvalidState` when there is no forward cache this layer can differentiate
    /// - `ShapeMismatch` when `grad_output` does not match the cached output shape
    fn backward(&mut self, grad_output: &Matrix, learning_rate: f64) -> Result<Matrix>;

    /// Check that `backward` would accept a gradient of shape `grad_shape`, without
    /// mutating anything.
    ///
    /// Returns the shape of the gradient `backward` would produce.
    fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)>;

    /// Get the input size of the layer.
    fn input_size(&self) -> usize;

    /// Get the output size of the layer.
    fn output_size(&self) -> usize;

    /// Get the number of trainable parameters in the layer.
    fn parameter_count(&self) -> usize;

    /// Short human-readable layer name, used in logs and error contexts.
    fn name(&self) -> &'static str;
}
