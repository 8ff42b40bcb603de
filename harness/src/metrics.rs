use crate::classification::{to_label, ConfusionCounts};

/// Aggregated metrics of one pass over a batch source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochMetrics {
    pub loss: f32,
    pub accuracy: f32,
    pub recall: f32,
    pub f1: f32,
}

/// Labels collected over a whole epoch, in batch order.
#[derive(Clone, Debug, Default)]
pub struct EpochRecord {
    pub predictions: Vec<i64>,
    pub targets: Vec<i64>,
}

/// Running sums for a single epoch.
///
/// Loss and accuracy are averaged per batch, not per example, so a short
/// final batch weighs as much as a full one.
#[derive(Debug, Default)]
pub struct EpochAccumulator {
    loss_sum: f32,
    accuracy_sum: f32,
    batches: usize,
    record: EpochRecord,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one batch. `predictions` are the rounded class outputs.
    pub fn push_batch(&mut self, loss: f32, predictions: &[f32], targets: &[f32]) {
        let matches = predictions
            .iter()
            .zip(targets)
            .filter(|(p, t)| to_label(**p) == to_label(**t))
            .count();

        self.loss_sum += loss;
        self.accuracy_sum += matches as f32 / predictions.len().max(1) as f32;
        self.batches += 1;

        self.record
            .predictions
            .extend(predictions.iter().map(|&p| to_label(p)));
        self.record
            .targets
            .extend(targets.iter().map(|&t| to_label(t)));
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Mean loss over the batches seen so far.
    pub fn current_loss(&self) -> f32 {
        self.loss_sum / self.batches.max(1) as f32
    }

    pub fn finish(self) -> (EpochMetrics, EpochRecord) {
        let batches = self.batches.max(1) as f32;
        let counts = ConfusionCounts::from_labels(&self.record.predictions, &self.record.targets);

        let metrics = EpochMetrics {
            loss: self.loss_sum / batches,
            accuracy: self.accuracy_sum / batches,
            recall: counts.weighted_recall() as f32,
            f1: counts.weighted_f1() as f32,
        };

        (metrics, self.record)
    }
}
