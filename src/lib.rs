//! Feed-forward neural network training engine
//!
//! An ordered stack of heterogeneous layers (dense + activation, batch normalization,
//! dropout) trained end to end by backpropagation with mini-batch SGD.
//!
//! # Modules
//!
//! - `layers`: Layer trait, execution mode and the Dense/BatchNorm/Dropout layers
//! - `model`: ordered layer stack with a model-wide mode flag
//! - `trainer`: mini-batch backpropagation driver and evaluation
//! - `loss`: mean squared error and its gradient
//! - `dataset`: paired input/target rows
//! - `utils`: matrix container, seeded RNG, activation functions
//! - `config`: training configuration loaded from JSON
//! - `architecture`: layer stacks described in JSON and built into models
//! - `error`: error taxonomy shared by every fallible call
//!
//! # Quick start
//!
//! ```
//! use layerstack::{Activation, Dataset, DenseLayer, Model, SimpleRng, Trainer};
//!
//! # fn main() -> layerstack::Result<()> {
//! let xs: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 10.0 - 1.0]).collect();
//! let ys: Vec<Vec<f64>> = xs.iter().map(|x| vec![2.0 * x[0]]).collect();
//! let data = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut rng = SimpleRng::new(42);
//! let model = Model::new(vec![
//!     DenseLayer::new(1, 8, Activation::ReLU, &mut rng)?.into(),
//!     DenseLayer::new(8, 1, Activation::Identity, &mut rng)?.into(),
//! ])?;
//!
//! let mut model = Trainer::new(10)?.train(model, &data, 200, 0.05)?;
//! let y = model.predict(&[0.5])?;
//! assert_eq!(y.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod architecture;
pub mod config;
pub mod dataset;
pub mod error;
pub mod layers;
pub mod loss;
pub mod model;
pub mod trainer;
pub mod utils;

pub use dataset::Dataset;
pub use error::{Error, Result};
pub use layers::{BatchNormLayer, DenseLayer, DropoutLayer, Layer, LayerKind, Mode};
pub use model::Model;
pub use trainer::{evaluate, TrainReport, Trainer};
pub use utils::{Activation, Matrix, SimpleRng};
