//! Paired input/target dataset
//!
//! Two equal-length sequences of fixed-width rows, stored contiguously. The trainer
//! gathers mini-batches out of it by index.

use crate::error::{Error, Result};
use crate::utils::Matrix;

/// A supervised dataset: row `i` of `inputs` is paired with row `i` of `targets`.
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Matrix,
    targets: Matrix,
}

impl Dataset {
    /// Build from two matrices with the same number of rows.
    pub fn new(inputs: Matrix, targets: Matrix) -> Result<Self> {
        if inputs.rows() == 0 {
            return Err(Error::InvalidData("dataset must not be empty".into()));
        }
        if inputs.rows() != targets.rows() {
            return Err(Error::InvalidData(format!(
                "inputs have {} rows but targets have {}",
                inputs.rows(),
                targets.rows()
            )));
        }
        if inputs.cols() == 0 || targets.cols() == 0 {
            return Err(Error::InvalidData(
                "input and target rows must have at least one value".into(),
            ));
        }
        Ok(Self { inputs, targets })
    }

    /// Build from per-sample rows.
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "{} inputs but {} targets",
                inputs.len(),
                targets.len()
            )));
        }
        let inputs = Matrix::from_rows(inputs)
            .map_err(|e| Error::InvalidData(format!("ragged inputs: {}", e)))?;
        let targets = Matrix::from_rows(targets)
            .map_err(|e| Error::InvalidData(format!("ragged targets: {}", e)))?;
        Self::new(inputs, targets)
    }

    pub fn len(&self) -> usize {
        self.inputs.rows()
    }

    /// Always false for a constructed dataset.
    pub fn is_empty(&self) -> bool {
        self.inputs.rows() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.inputs.cols()
    }

    pub fn target_dim(&self) -> usize {
        self.targets.cols()
    }

    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    pub fn targets(&self) -> &Matrix {
        &self.targets
    }

    /// Gather the samples at `indices` into an `(inputs, targets)` mini-batch.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range.
    pub fn batch(&self, indices: &[usize]) -> (Matrix, Matrix) {
        (
            self.inputs.select_rows(indices),
            self.targets.select_rows(indices),
        )
    }
}
