//! Dense (fully connected) layer with an element-wise activation
//!
//! This module provides a DenseLayer that performs the transformation
//! `A = f(X · Wᵗ + b)` and trains its own weights and biases by SGD during `backward`.

use crate::error::{Error, Result};
use crate::layers::{Layer, Mode};
use crate::utils::{Activation, Matrix, SimpleRng};

/// Dense (fully connected) layer with weights, biases and an activation.
///
/// Performs `z = x Wᵗ + b`, `a = f(z)` for every row `x` of the batch, where
/// W is the weight matrix (output_size × input_size) and b the bias vector (output_size).
///
/// # Fields
///
/// * `input_size` - Number of input features
/// * `output_size` - Number of output features
/// * `activation` - Activation applied element-wise to `z`
/// * `weights` - Weight matrix stored row-major (output_size × input_size)
/// * `biases` - Bias vector (output_size)
/// * `cache` - Input and pre-activation of the last forward call
///
/// # Example
///
/// ```
/// use layerstack::layers::DenseLayer;
/// use layerstack::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(784, 512, Activation::ReLU, &mut rng).unwrap();
/// assert_eq!(layer.weights().len(), 784 * 512);
/// ```
#[derive(Debug, Clone)]
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    activation: Activation,
    weights: Vec<f64>,
    biases: Vec<f64>,
    cache: Option<DenseCache>,
}

#[derive(Debug, Clone)]
struct DenseCache {
    input: Matrix,
    pre_activation: Matrix,
}

/// Gradients of the batch loss for one dense layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGradients {
    /// dL/dW, same layout as the weights (output_size × input_size)
    pub weights: Vec<f64>,
    /// dL/db
    pub biases: Vec<f64>,
    /// dL/dX, one row per sample
    pub input: Matrix,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled uniformly from [-limit, limit] where
    /// limit = sqrt(6 / (input_size + output_size)). Biases start at zero.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the activation's parameters are invalid (e.g. a negative or
    /// NaN leaky ReLU slope).
    pub fn new(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        activation.validate()?;

        // Xavier initialization: limit = sqrt(6 / (fan_in + fan_out))
        let limit = (6.0 / (input_size + output_size).max(1) as f64).sqrt();
        let weights = (0..input_size * output_size)
            .map(|_| rng.gen_range(-limit, limit))
            .collect();

        Ok(Self {
            input_size,
            output_size,
            activation,
            weights,
            biases: vec![0.0; output_size],
            cache: None,
        })
    }

    /// Create a layer from explicit parameters.
    ///
    /// `weights` is row-major (output_size × input_size).
    pub fn with_parameters(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        weights: Vec<f64>,
        biases: Vec<f64>,
    ) -> Result<Self> {
        activation.validate()?;
        if weights.len() != input_size * output_size {
            return Err(Error::shape(
                "dense weights",
                format!("{} values ({} x {})", input_size * output_size, output_size, input_size),
                format!("{} values", weights.len()),
            ));
        }
        if biases.len() != output_size {
            return Err(Error::shape(
                "dense biases",
                format!("{} values", output_size),
                format!("{} values", biases.len()),
            ));
        }

        Ok(Self {
            input_size,
            output_size,
            activation,
            weights,
            biases,
            cache: None,
        })
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Row-major weights (output_size × input_size).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    /// Mutable access to the weights, e.g. for finite-difference checks.
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    pub fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    /// Compute the gradients for `grad_output` (dL/dA) against the last forward call,
    /// without touching the parameters.
    ///
    /// `grad_output` is already the gradient of the batch loss, so per-sample
    /// contributions are summed: `dW = dZᵗ·X`, `db = Σ dZ`, `dX = dZ·W`.
    pub fn compute_gradients(&self, grad_output: &Matrix) -> Result<DenseGradients> {
        self.check_backward(grad_output.shape())?;
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| Error::InvalidState("dense backward called before forward".into()))?;

        let batch_size = grad_output.rows();

        // dZ = dA ⊙ f'(Z)
        let mut grad_pre = grad_output.clone();
        for (g, &z) in grad_pre
            .as_mut_slice()
            .iter_mut()
            .zip(cache.pre_activation.as_slice())
        {
            *g *= self.activation.derivative(z);
        }

        let mut grad_weights = vec![0.0; self.weights.len()];
        let mut grad_input = Matrix::zeros(batch_size, self.input_size);
        for i in 0..batch_size {
            let x = cache.input.row(i);
            let dz = grad_pre.row(i);
            let dx = grad_input.row_mut(i);
            for (o, &d) in dz.iter().enumerate() {
                if d == 0.0 {
                    continue;
                }
                let w_row = &self.weights[o * self.input_size..(o + 1) * self.input_size];
                let gw_row = &mut grad_weights[o * self.input_size..(o + 1) * self.input_size];
                for k in 0..self.input_size {
                    gw_row[k] += d * x[k];
                    dx[k] += d * w_row[k];
                }
            }
        }

        Ok(DenseGradients {
            weights: grad_weights,
            biases: grad_pre.column_sums(),
            input: grad_input,
        })
    }

    /// Apply one SGD step: `param -= learning_rate * grad`.
    pub fn apply_gradients(&mut self, grads: &DenseGradients, learning_rate: f64) -> Result<()> {
        if grads.weights.len() != self.weights.len() || grads.biases.len() != self.biases.len() {
            return Err(Error::shape(
                "dense parameter update",
                format!("{} weights, {} biases", self.weights.len(), self.biases.len()),
                format!("{} weights, {} biases", grads.weights.len(), grads.biases.len()),
            ));
        }

        for (param, grad) in self.weights.iter_mut().zip(&grads.weights) {
            *param -= learning_rate * grad;
        }
        for (param, grad) in self.biases.iter_mut().zip(&grads.biases) {
            *param -= learning_rate * grad;
        }
        Ok(())
    }
}

impl Layer for DenseLayer {
    /// Mode is ignored: a dense layer behaves the same in training and inference.
    fn forward(&mut self, input: &Matrix, _mode: Mode) -> Result<Matrix> {
        if input.cols() != self.input_size {
            return Err(Error::shape(
                "dense forward input",
                format!("{} columns", self.input_size),
                format!("{} columns", input.cols()),
            ));
        }

        let batch_size = input.rows();
        let mut pre_activation = Matrix::zeros(batch_size, self.output_size);
        for i in 0..batch_size {
            let x = input.row(i);
            let z = pre_activation.row_mut(i);
            for (o, value) in z.iter_mut().enumerate() {
                let w_row = &self.weights[o * self.input_size..(o + 1) * self.input_size];
                *value = w_row
                    .iter()
                    .zip(x)
                    .fold(self.biases[o], |acc, (&w, &xk)| w.mul_add(xk, acc));
            }
        }

        let activation = self.activation;
        let output = pre_activation.map(|z| activation.apply(z));
        self.cache = Some(DenseCache {
            input: input.clone(),
            pre_activation,
        });
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Matrix, learning_rate: f64) -> Result<Matrix> {
        let grads = self.compute_gradients(grad_output)?;
        self.apply_gradients(&grads, learning_rate)?;
        Ok(grads.input)
    }

    fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| Error::InvalidState("dense backward called before forward".into()))?;
        let expected = (cache.input.rows(), self.output_size);
        if grad_shape != expected {
            return Err(Error::shape(
                "dense backward gradient",
                format!("{:?}", expected),
                format!("{:?}", grad_shape),
            ));
        }
        Ok((cache.input.rows(), self.input_size))
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    /// input_size × output_size weights plus output_size biases.
    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    fn name(&self) -> &'static str {
        "dense"
    }
}
