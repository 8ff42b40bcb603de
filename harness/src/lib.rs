pub mod classification;
pub mod data;
pub mod early_stopping;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod progress;
pub mod results;
pub mod sink;
pub mod step;
pub mod trainer;

#[cfg(test)]
mod tests;

pub use data::{Batch, BatchSource, Batches, TensorDataset};
pub use early_stopping::{EarlyStopping, StoppingState, DEFAULT_PATIENCE};
pub use metrics::{EpochAccumulator, EpochMetrics, EpochRecord};
pub use results::RunResults;
pub use sink::{MemorySink, MetricsSink, ModelGraph, RunWriter};
pub use step::{eval_step, train_step};
pub use trainer::Trainer;
