// Dropout tests: inference identity, inverted scaling, masks and seeding.

use approx::assert_relative_eq;
use layerstack::layers::{DropoutLayer, Layer, Mode};
use layerstack::Matrix;

fn input() -> Matrix {
    Matrix::row_vector(&[-2.0, -1.25, -0.5, 0.0, 0.4, 0.8, 1.0, 1.5, 1.75, 2.0])
}

#[test]
fn test_inference_is_identity() {
    let mut dropout = DropoutLayer::new(10, 0.5, 1).unwrap();
    let x = input();
    assert_eq!(dropout.forward(&x, Mode::Inference).unwrap(), x);
    assert!(dropout.mask().is_none());
}

#[test]
fn test_keep_prob_one_is_identity_in_training() {
    let mut dropout = DropoutLayer::new(10, 1.0, 1).unwrap();
    let x = input();
    assert_eq!(dropout.forward(&x, Mode::Train).unwrap(), x);
}

#[test]
fn test_train_output_is_zero_or_scaled() {
    let keep_prob = 0.6;
    let mut dropout = DropoutLayer::new(10, keep_prob, 11).unwrap();
    let x = input();
    let y = dropout.forward(&x, Mode::Train).unwrap();
    let mask = dropout.mask().unwrap();

    for ((&out, &inp), &m) in y.as_slice().iter().zip(x.as_slice()).zip(mask.as_slice()) {
        assert!(m == 0.0 || m == 1.0);
        if m == 1.0 {
            assert_relative_eq!(out, inp / keep_prob, epsilon = 1e-12);
        } else {
            assert_eq!(out, 0.0);
        }
    }
}

#[test]
fn test_expected_train_output_matches_input() {
    let mut dropout = DropoutLayer::new(10, 0.7, 2024).unwrap();
    let x = input();
    let trials = 20_000;
    let mut sum = vec![0.0; 10];
    for _ in 0..trials {
        let y = dropout.forward(&x, Mode::Train).unwrap();
        for (acc, v) in sum.iter_mut().zip(y.as_slice()) {
            *acc += v;
        }
    }
    for (acc, &expected) in sum.iter().zip(x.as_slice()) {
        assert_relative_eq!(acc / trials as f64, expected, epsilon = 0.05);
    }
}

#[test]
fn test_keep_fraction_matches_keep_prob() {
    let mut dropout = DropoutLayer::new(50, 0.8, 5).unwrap();
    dropout.forward(&Matrix::zeros(400, 50), Mode::Train).unwrap();
    let mask = dropout.mask().unwrap();
    let kept = mask.as_slice().iter().sum::<f64>() / mask.as_slice().len() as f64;
    assert_relative_eq!(kept, 0.8, epsilon = 0.01);
}

#[test]
fn test_fresh_mask_each_training_pass() {
    let mut dropout = DropoutLayer::new(50, 0.5, 9).unwrap();
    let x = Matrix::zeros(4, 50);
    dropout.forward(&x, Mode::Train).unwrap();
    let first = dropout.mask().unwrap().clone();
    dropout.forward(&x, Mode::Train).unwrap();
    assert_ne!(&first, dropout.mask().unwrap());
}

#[test]
fn test_same_seed_same_masks() {
    let mut a = DropoutLayer::new(10, 0.5, 77).unwrap();
    let mut b = DropoutLayer::new(10, 0.5, 77).unwrap();
    for _ in 0..3 {
        let ya = a.forward(&input(), Mode::Train).unwrap();
        let yb = b.forward(&input(), Mode::Train).unwrap();
        assert_eq!(ya, yb);
    }
}

#[test]
fn test_backward_uses_training_mask() {
    let keep_prob = 0.5;
    let mut dropout = DropoutLayer::new(10, keep_prob, 3).unwrap();
    dropout.forward(&input(), Mode::Train).unwrap();
    let mask = dropout.mask().unwrap().clone();

    let grad = Matrix::row_vector(&[1.0; 10]);
    let dx = dropout.backward(&grad, 0.1).unwrap();
    for (&d, &m) in dx.as_slice().iter().zip(mask.as_slice()) {
        assert_relative_eq!(d, m / keep_prob, epsilon = 1e-12);
    }
}

#[test]
fn test_backward_after_inference_is_invalid_state() {
    let mut dropout = DropoutLayer::new(10, 0.5, 3).unwrap();
    dropout.forward(&input(), Mode::Train).unwrap();
    dropout.forward(&input(), Mode::Inference).unwrap();
    let err = dropout
        .backward(&Matrix::row_vector(&[1.0; 10]), 0.1)
        .unwrap_err();
    assert!(err.is_invalid_state());
}

#[test]
fn test_invalid_keep_prob() {
    assert!(DropoutLayer::new(4, 0.0, 1).is_err());
    assert!(DropoutLayer::new(4, 1.2, 1).is_err());
    assert!(DropoutLayer::new(4, f64::NAN, 1).is_err());
}
