//! Mean squared error loss
//!
//! `L = (1/N) · Σᵢ ‖ŷᵢ − yᵢ‖²` over the `N` rows of a batch, and its gradient
//! `dL/dŶ = 2 · (Ŷ − Y) / N`, which seeds the backward pass.

use crate::error::{Error, Result};
use crate::utils::Matrix;

fn check_shapes(prediction: &Matrix, target: &Matrix) -> Result<()> {
    if prediction.shape() != target.shape() {
        return Err(Error::shape(
            "mse target",
            format!("{:?}", prediction.shape()),
            format!("{:?}", target.shape()),
        ));
    }
    if prediction.rows() == 0 {
        return Err(Error::InvalidData("mse of an empty batch".into()));
    }
    Ok(())
}

/// Mean (over samples) of the squared error summed over output features.
pub fn mse(prediction: &Matrix, target: &Matrix) -> Result<f64> {
    check_shapes(prediction, target)?;
    let sum: f64 = prediction
        .as_slice()
        .iter()
        .zip(target.as_slice())
        .map(|(&p, &t)| (p - t) * (p - t))
        .sum();
    Ok(sum / prediction.rows() as f64)
}

/// Gradient of [`mse`] w.r.t. the prediction.
pub fn mse_gradient(prediction: &Matrix, target: &Matrix) -> Result<Matrix> {
    check_shapes(prediction, target)?;
    let scale = 2.0 / prediction.rows() as f64;
    let mut grad = prediction.clone();
    for (g, &t) in grad.as_mut_slice().iter_mut().zip(target.as_slice()) {
        *g = scale * (*g - t);
    }
    Ok(grad)
}
