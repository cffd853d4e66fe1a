use layerstack::architecture::{build_model, load_architecture};
use layerstack::config::load_config;
use layerstack::trainer::evaluate;
use layerstack::{Dataset, Model, Trainer};
use std::env;
use std::error::Error;

// Regress one full period of a sine, sampled on x in [-1, 1], with a small ReLU
// network, with and without batch normalization + dropout after the hidden layer.
const NUM_SAMPLES: usize = 100;
const TRAINING_CONFIG: &str = "config/sine_training.json";
const PLAIN_ARCHITECTURE: &str = "config/architectures/sine_mlp.json";
const REGULARIZED_ARCHITECTURE: &str = "config/architectures/sine_mlp_regularized.json";

fn target(x: f64) -> f64 {
    (std::f64::consts::PI * x).sin()
}

// Evenly spaced points on [-1, 1] paired with sin(πx).
fn sine_dataset(samples: usize) -> Result<Dataset, Box<dyn Error>> {
    let step = 2.0 / (samples - 1) as f64;
    let xs: Vec<Vec<f64>> = (0..samples).map(|i| vec![-1.0 + step * i as f64]).collect();
    let ys: Vec<Vec<f64>> = xs.iter().map(|x| vec![target(x[0])]).collect();
    Ok(Dataset::from_rows(&xs, &ys)?)
}

fn run(
    label: &str,
    architecture: &str,
    trainer: &Trainer,
    data: &Dataset,
    epochs: usize,
    learning_rate: f64,
) -> Result<Model, Box<dyn Error>> {
    let config = load_architecture(architecture)?;
    let mut model = build_model(&config)?;
    let initial = evaluate(&mut model, data)?;
    tracing::info!(
        model = label,
        parameters = model.parameter_count(),
        initial_mse = initial,
        "training"
    );

    let mut model = trainer.train(model, data, epochs, learning_rate)?;
    let final_mse = evaluate(&mut model, data)?;
    println!("{:<12} initial MSE {:.6} -> final MSE {:.6}", label, initial, final_mse);
    Ok(model)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Optional argument: path to a training config.
    let config_path = env::args().nth(1).unwrap_or_else(|| TRAINING_CONFIG.to_string());
    let config = load_config(&config_path)?;
    let trainer = Trainer::from_config(&config)?;
    let data = sine_dataset(NUM_SAMPLES)?;

    let mut plain = run(
        "plain",
        PLAIN_ARCHITECTURE,
        &trainer,
        &data,
        config.epochs,
        config.learning_rate,
    )?;
    run(
        "regularized",
        REGULARIZED_ARCHITECTURE,
        &trainer,
        &data,
        config.epochs,
        config.learning_rate,
    )?;

    println!("\nSample predictions (plain model):");
    for &x in &[-1.0f64, -0.5, 0.0, 0.5, 1.0] {
        let y = plain.predict(&[x])?;
        println!("x = {:>5.2}  target = {:>7.4}  predicted = {:>7.4}", x, target(x), y[0]);
    }
    Ok(())
}
