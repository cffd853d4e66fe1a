//! Mini-batch backpropagation trainer
//!
//! For every epoch and every mini-batch the trainer switches the model to training mode,
//! runs the forward pass, seeds the backward pass with the MSE gradient and lets each
//! layer update itself with the caller's learning rate. There is no momentum, weight
//! decay or schedule: callers that want decay pass a different rate per call.
//!
//! NaN/Inf are not trapped. A non-finite epoch loss is logged once as a warning and
//! training continues; normalizing data and picking a stable learning rate is up to the
//! caller.

use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::layers::Mode;
use crate::loss;
use crate::model::Model;
use crate::utils::{Matrix, SimpleRng};

/// Per-epoch record of a training call.
#[derive(Debug, Clone, Default)]
pub struct TrainReport {
    /// Training-mode MSE of each epoch, averaged over samples.
    pub epoch_losses: Vec<f64>,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Mini-batch SGD driver.
#[derive(Debug, Clone)]
pub struct Trainer {
    batch_size: usize,
    shuffle_seed: Option<u64>,
}

impl Trainer {
    /// Trainer with the given mini-batch size, visiting samples in dataset order.
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".into()));
        }
        Ok(Self {
            batch_size,
            shuffle_seed: None,
        })
    }

    /// Re-shuffle batch membership every epoch with a generator seeded by `seed`.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Trainer matching a [`TrainingConfig`].
    pub fn from_config(config: &TrainingConfig) -> Result<Self> {
        let trainer = Self::new(config.batch_size)?;
        Ok(match config.shuffle_seed {
            Some(seed) => trainer.with_shuffle(seed),
            None => trainer,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    /// Train `model` for `epochs` passes over `data` and hand it back.
    ///
    /// The returned model reflects every update applied during the call.
    pub fn train(
        &self,
        mut model: Model,
        data: &Dataset,
        epochs: usize,
        learning_rate: f64,
    ) -> Result<Model> {
        self.fit(&mut model, data, epochs, learning_rate)?;
        Ok(model)
    }

    /// In-place form of [`Trainer::train`] returning per-epoch losses.
    pub fn fit(
        &self,
        model: &mut Model,
        data: &Dataset,
        epochs: usize,
        learning_rate: f64,
    ) -> Result<TrainReport> {
        if epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".into()));
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {}",
                learning_rate
            )));
        }
        check_dataset(model, data)?;

        let mut order: Vec<usize> = (0..data.len()).collect();
        let mut rng = self.shuffle_seed.map(SimpleRng::new);
        let mut report = TrainReport {
            epoch_losses: Vec::with_capacity(epochs),
        };
        let mut warned = false;

        for epoch in 0..epochs {
            if let Some(rng) = rng.as_mut() {
                rng.shuffle(&mut order);
            }

            let mut weighted_loss = 0.0;
            for chunk in order.chunks(self.batch_size) {
                let (inputs, targets) = data.batch(chunk);
                let batch_loss = train_batch(model, &inputs, &targets, learning_rate)?;
                weighted_loss += batch_loss * chunk.len() as f64;
            }

            let epoch_loss = weighted_loss / data.len() as f64;
            if !epoch_loss.is_finite() && !warned {
                tracing::warn!(
                    epoch = epoch + 1,
                    learning_rate,
                    "training loss is no longer finite; check input/target scaling and learning rate"
                );
                warned = true;
            }
            tracing::debug!("Epoch {}: loss = {:.6}", epoch + 1, epoch_loss);
            report.epoch_losses.push(epoch_loss);
        }

        tracing::info!(
            epochs,
            batch_size = self.batch_size,
            final_loss = report.final_loss().unwrap_or(f64::NAN),
            "training finished"
        );
        Ok(report)
    }
}

/// One forward/backward/update cycle on a single mini-batch.
///
/// Returns the batch MSE measured before the update.
pub fn train_batch(
    model: &mut Model,
    inputs: &Matrix,
    targets: &Matrix,
    learning_rate: f64,
) -> Result<f64> {
    model.set_mode(Mode::Train);
    let prediction = model.forward(inputs)?;
    let batch_loss = loss::mse(&prediction, targets)?;
    let grad = loss::mse_gradient(&prediction, targets)?;
    model.backward(&grad, learning_rate)?;
    Ok(batch_loss)
}

/// Inference-mode MSE of `model` over the whole dataset.
pub fn evaluate(model: &mut Model, data: &Dataset) -> Result<f64> {
    check_dataset(model, data)?;
    let prediction = model.predict_batch(data.inputs())?;
    loss::mse(&prediction, data.targets())
}

fn check_dataset(model: &Model, data: &Dataset) -> Result<()> {
    if data.input_dim() != model.input_size() {
        return Err(Error::shape(
            "dataset inputs",
            format!("{} features (model input)", model.input_size()),
            format!("{} features", data.input_dim()),
        ));
    }
    if data.target_dim() != model.output_size() {
        return Err(Error::shape(
            "dataset targets",
            format!("{} values (model output)", model.output_size()),
            format!("{} values", data.target_dim()),
        ));
    }
    Ok(())
}
