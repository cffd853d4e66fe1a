// Backward pass tests: shape and state errors, atomic failure and SGD updates.

use approx::assert_relative_eq;
use layerstack::layers::{DenseLayer, Layer, Mode};
use layerstack::loss::mse_gradient;
use layerstack::{Activation, BatchNormLayer, DropoutLayer, Matrix, Model, SimpleRng};

fn model() -> Model {
    let mut rng = SimpleRng::new(12);
    Model::new(vec![
        DenseLayer::new(2, 5, Activation::LeakyReLU { alpha: 0.1 }, &mut rng).unwrap().into(),
        BatchNormLayer::new(5).into(),
        DropoutLayer::new(5, 0.9, 4).unwrap().into(),
        DenseLayer::new(5, 1, Activation::Identity, &mut rng).unwrap().into(),
    ])
    .unwrap()
}

fn batch() -> Matrix {
    Matrix::from_rows(&[
        vec![0.2, -0.6],
        vec![-0.9, 0.4],
        vec![0.5, 0.5],
        vec![0.0, -0.1],
    ])
    .unwrap()
}

fn dense_weights(model: &Model) -> Vec<Vec<f64>> {
    model
        .layers()
        .iter()
        .filter_map(|l| l.as_dense())
        .map(|d| d.weights().to_vec())
        .collect()
}

#[test]
fn test_dense_backward_before_forward_is_invalid_state() {
    let mut rng = SimpleRng::new(1);
    let mut layer = DenseLayer::new(2, 3, Activation::ReLU, &mut rng).unwrap();
    let err = layer.backward(&Matrix::zeros(1, 3), 0.1).unwrap_err();
    assert!(err.is_invalid_state());
}

#[test]
fn test_dense_backward_rejects_wrong_width() {
    let mut rng = SimpleRng::new(1);
    let mut layer = DenseLayer::new(2, 3, Activation::ReLU, &mut rng).unwrap();
    layer.forward(&batch(), Mode::Train).unwrap();
    let before = layer.weights().to_vec();

    let err = layer.backward(&Matrix::zeros(4, 2), 0.1).unwrap_err();
    assert!(err.is_shape_mismatch());
    assert_eq!(layer.weights(), before.as_slice());
}

#[test]
fn test_model_backward_rejects_wrong_width() {
    let mut model = model();
    model.set_mode(Mode::Train);
    model.forward(&batch()).unwrap();
    let err = model.backward(&Matrix::zeros(4, 3), 0.1).unwrap_err();
    assert!(err.is_shape_mismatch());
}

#[test]
fn test_failure_deep_in_stack_leaves_every_layer_untouched() {
    let mut model = model();
    model.set_mode(Mode::Train);
    let x = batch();
    let prediction = model.forward(&x).unwrap();

    // An evaluation pass through the dropout layer discards its mask.
    let hidden = Matrix::zeros(4, 5);
    model.layers_mut()[2].forward(&hidden, Mode::Inference).unwrap();

    let before = dense_weights(&model);
    let target = Matrix::zeros(4, 1);
    let err = model
        .backward(&mse_gradient(&prediction, &target).unwrap(), 0.5)
        .unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(dense_weights(&model), before);
}

#[test]
fn test_backward_applies_sgd_step() {
    let mut layer = DenseLayer::with_parameters(
        2,
        1,
        Activation::Identity,
        vec![0.5, -0.25],
        vec![0.1],
    )
    .unwrap();
    let x = Matrix::from_rows(&[vec![1.0, 2.0], vec![-1.0, 0.0]]).unwrap();
    layer.forward(&x, Mode::Train).unwrap();

    let grad_output = Matrix::from_rows(&[vec![1.0], vec![3.0]]).unwrap();
    let lr = 0.1;
    let grads = layer.compute_gradients(&grad_output).unwrap();
    // dW = dZᵗX = [1 + (-3), 2 + 0], db = Σ dZ = 4
    assert_relative_eq!(grads.weights[0], -2.0, epsilon = 1e-12);
    assert_relative_eq!(grads.weights[1], 2.0, epsilon = 1e-12);
    assert_relative_eq!(grads.biases[0], 4.0, epsilon = 1e-12);

    let dx = layer.backward(&grad_output, lr).unwrap();
    // dX = dZ · W with the weights from before the step.
    assert_eq!(dx.as_slice(), &[0.5, -0.25, 1.5, -0.75]);
    assert_relative_eq!(layer.weights()[0], 0.5 + 2.0 * lr, epsilon = 1e-12);
    assert_relative_eq!(layer.weights()[1], -0.25 - 2.0 * lr, epsilon = 1e-12);
    assert_relative_eq!(layer.biases()[0], 0.1 - 4.0 * lr, epsilon = 1e-12);
}

#[test]
fn test_batchnorm_and_dropout_have_no_parameters() {
    let model = model();
    assert_eq!(model.layers()[1].parameter_count(), 0);
    assert_eq!(model.layers()[2].parameter_count(), 0);
    assert_eq!(model.parameter_count(), 2 * 5 + 5 + 5 + 1);
}

#[test]
fn test_training_step_reduces_loss() {
    let mut rng = SimpleRng::new(2);
    let mut model = Model::new(vec![
        DenseLayer::new(2, 4, Activation::Sigmoid, &mut rng).unwrap().into(),
        DenseLayer::new(4, 1, Activation::Identity, &mut rng).unwrap().into(),
    ])
    .unwrap();
    let x = batch();
    let y = Matrix::from_rows(&[vec![0.3], vec![-0.5], vec![1.0], vec![0.1]]).unwrap();

    model.set_mode(Mode::Train);
    let first = model.forward(&x).unwrap();
    let loss_before = layerstack::loss::mse(&first, &y).unwrap();
    model
        .backward(&mse_gradient(&first, &y).unwrap(), 0.05)
        .unwrap();
    let second = model.forward(&x).unwrap();
    let loss_after = layerstack::loss::mse(&second, &y).unwrap();
    assert!(loss_after < loss_before);
}

#[test]
fn test_sgd_step_is_learning_rate_times_loss_gradient() {
    // The step must not shrink with the batch size: for any N the applied update is
    // lr · dL/dW of the batch MSE.
    let loss_at = |weights: &[f64], x: &Matrix, y: &Matrix| -> f64 {
        let mut layer =
            DenseLayer::with_parameters(2, 1, Activation::Identity, weights.to_vec(), vec![0.0])
                .unwrap();
        let prediction = layer.forward(x, Mode::Train).unwrap();
        layerstack::loss::mse(&prediction, y).unwrap()
    };

    let weights = vec![0.3, -0.7];
    let lr = 0.1;
    let h = 1e-6;
    for rows in [1usize, 4, 20] {
        let xs: Vec<Vec<f64>> = (0..rows)
            .map(|i| vec![i as f64 / rows as f64 - 0.5, 1.0 - i as f64 * 0.05])
            .collect();
        let ys: Vec<Vec<f64>> = (0..rows).map(|i| vec![(i % 3) as f64 - 1.0]).collect();
        let x = Matrix::from_rows(&xs).unwrap();
        let y = Matrix::from_rows(&ys).unwrap();

        let mut layer =
            DenseLayer::with_parameters(2, 1, Activation::Identity, weights.clone(), vec![0.0])
                .unwrap();
        let prediction = layer.forward(&x, Mode::Train).unwrap();
        layer
            .backward(&mse_gradient(&prediction, &y).unwrap(), lr)
            .unwrap();

        for k in 0..2 {
            let mut plus = weights.clone();
            plus[k] += h;
            let mut minus = weights.clone();
            minus[k] -= h;
            let gradient = (loss_at(&plus, &x, &y) - loss_at(&minus, &x, &y)) / (2.0 * h);
            let step = weights[k] - layer.weights()[k];
            assert_relative_eq!(step, lr * gradient, epsilon = 1e-9, max_relative = 1e-5);
        }
    }
}
