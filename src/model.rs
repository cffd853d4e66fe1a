//! Sequential model: an ordered stack of layers plus the execution mode
//!
//! The model chains `forward` left to right and `backward` right to left. A backward pass
//! is validated end to end (cached state and every intermediate gradient shape) before the
//! first layer updates its parameters, so a failing pass leaves the model untouched.

use crate::error::{Error, Result};
use crate::layers::{Layer, LayerKind, Mode};
use crate::utils::Matrix;

/// Ordered stack of layers trained as one network.
///
/// # Example
///
/// ```
/// use layerstack::layers::DenseLayer;
/// use layerstack::model::Model;
/// use layerstack::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(1);
/// let model = Model::new(vec![
///     DenseLayer::new(1, 8, Activation::ReLU, &mut rng).unwrap().into(),
///     DenseLayer::new(8, 1, Activation::Identity, &mut rng).unwrap().into(),
/// ])
/// .unwrap();
/// assert_eq!(model.input_size(), 1);
/// assert_eq!(model.parameter_count(), 8 + 8 + 8 + 1);
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    layers: Vec<LayerKind>,
    mode: Mode,
}

impl Model {
    /// Build a model, checking that each layer's output width feeds the next layer.
    ///
    /// The model starts in [`Mode::Inference`].
    pub fn new(layers: Vec<LayerKind>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "model must have at least one layer".into(),
            ));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            if current.output_size() != next.input_size() {
                return Err(Error::shape(
                    format!(
                        "connection between layer {} ({}) and layer {} ({})",
                        i,
                        current.name(),
                        i + 1,
                        next.name()
                    ),
                    format!("input size {}", current.output_size()),
                    format!("input size {}", next.input_size()),
                ));
            }
        }

        Ok(Self {
            layers,
            mode: Mode::Inference,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the model-wide mode used by subsequent `forward` calls.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn layers(&self) -> &[LayerKind] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [LayerKind] {
        &mut self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }

    /// Run a batch through every layer in the current mode.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let mode = self.mode;
        let mut iter = self.layers.iter_mut();
        // Model::new guarantees at least one layer.
        let first = iter
            .next()
            .ok_or_else(|| Error::InvalidState("model has no layers".into()))?;
        let mut activations = first.forward(input, mode)?;
        for layer in iter {
            activations = layer.forward(&activations, mode)?;
        }
        Ok(activations)
    }

    /// Backpropagate `grad_output` (dL/dŶ of the last forward) through the stack,
    /// letting each parametric layer apply its SGD step with `learning_rate`.
    ///
    /// Returns the gradient w.r.t. the model input.
    pub fn backward(&mut self, grad_output: &Matrix, learning_rate: f64) -> Result<Matrix> {
        self.check_backward(grad_output.shape())?;

        let mut grad = grad_output.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad, learning_rate)?;
        }
        Ok(grad)
    }

    /// Validate a backward pass without mutating any layer.
    pub fn check_backward(&self, grad_shape: (usize, usize)) -> Result<(usize, usize)> {
        self.layers
            .iter()
            .rev()
            .try_fold(grad_shape, |shape, layer| layer.check_backward(shape))
    }

    /// Predict a single sample in inference mode.
    ///
    /// Leaves the model in [`Mode::Inference`]. Only batch-norm running statistics are
    /// consulted; no learnable parameter or statistic changes.
    pub fn predict(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let output = self.predict_batch(&Matrix::row_vector(input))?;
        Ok(output.into_vec())
    }

    /// Predict a batch of samples in inference mode.
    pub fn predict_batch(&mut self, inputs: &Matrix) -> Result<Matrix> {
        self.set_mode(Mode::Inference);
        self.forward(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{BatchNormLayer, DenseLayer, DropoutLayer};
    use crate::utils::{Activation, SimpleRng};

    fn small_model() -> Model {
        let mut rng = SimpleRng::new(5);
        Model::new(vec![
            DenseLayer::new(2, 4, Activation::ReLU, &mut rng).unwrap().into(),
            BatchNormLayer::new(4).into(),
            DropoutLayer::new(4, 0.8, 11).unwrap().into(),
            DenseLayer::new(4, 1, Activation::Identity, &mut rng).unwrap().into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_and_mismatched() {
        assert!(Model::new(vec![]).is_err());

        let mut rng = SimpleRng::new(1);
        let err = Model::new(vec![
            DenseLayer::new(2, 3, Activation::ReLU, &mut rng).unwrap().into(),
            DenseLayer::new(4, 1, Activation::Identity, &mut rng).unwrap().into(),
        ])
        .unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_forward_shapes() {
        let mut model = small_model();
        model.set_mode(Mode::Train);
        let x = Matrix::from_rows(&[vec![0.1, 0.2], vec![0.3, -0.4], vec![0.0, 1.0]]).unwrap();
        let y = model.forward(&x).unwrap();
        assert_eq!(y.shape(), (3, 1));
    }

    #[test]
    fn test_predict_sets_inference_mode() {
        let mut model = small_model();
        model.set_mode(Mode::Train);
        let out = model.predict(&[0.5, -0.5]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(model.mode(), Mode::Inference);
    }

    #[test]
    fn test_backward_after_predict_is_invalid_state() {
        let mut model = small_model();
        model.predict(&[0.5, -0.5]).unwrap();
        let err = model.backward(&Matrix::zeros(1, 1), 0.1).unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_backward_shape_mismatch_is_atomic() {
        let mut model = small_model();
        model.set_mode(Mode::Train);
        let x = Matrix::from_rows(&[vec![0.1, 0.2], vec![0.3, -0.4]]).unwrap();
        model.forward(&x).unwrap();

        let before = model.layers()[3].as_dense().unwrap().weights().to_vec();
        let err = model.backward(&Matrix::zeros(2, 2), 0.1).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(model.layers()[3].as_dense().unwrap().weights(), &before[..]);
    }

    #[test]
    fn test_backward_returns_input_gradient() {
        let mut model = small_model();
        model.set_mode(Mode::Train);
        let x = Matrix::from_rows(&[vec![0.1, 0.2], vec![0.3, -0.4]]).unwrap();
        model.forward(&x).unwrap();
        let grad = model.backward(&Matrix::from_rows(&[vec![1.0], vec![-1.0]]).unwrap(), 0.01);
        assert_eq!(grad.unwrap().shape(), (2, 2));
    }
}
