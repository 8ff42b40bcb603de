use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "Classifier Trainer")]
#[command(version = "0.1.0")]
pub struct Args {
    /// CSV file: feature columns followed by a 0/1 label column.
    #[arg(long)]
    pub data: PathBuf,

    /// Number of examples per batch.
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Learning rate for the optimizer.
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Maximum number of training epochs.
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Epochs without improvement before early stopping.
    #[arg(long, default_value_t = 5)]
    pub patience: u64,

    /// Fraction of data held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_ratio: f64,

    /// Width of the hidden layers.
    #[arg(long, default_value_t = 32)]
    pub hidden_size: usize,

    /// Dropout probability after the first layer.
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f32,

    /// Seed for the train/test split and shuffling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Directory for scalars and the model graph.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log the run to runs/<timestamp> when no --log-dir is given.
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Where to write the per-epoch results.
    #[arg(long, default_value = "results.csv")]
    pub output: PathBuf,

    /// Save the trained weights to this safetensors file.
    #[arg(long)]
    pub model: Option<PathBuf>,
}
