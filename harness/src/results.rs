use std::io::{self, Write};

use crate::metrics::EpochMetrics;

/// Per-epoch history of a training run, one value per series per epoch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunResults {
    pub train_loss: Vec<f32>,
    pub train_acc: Vec<f32>,
    pub train_recall: Vec<f32>,
    pub train_f1: Vec<f32>,
    pub test_loss: Vec<f32>,
    pub test_acc: Vec<f32>,
    pub test_recall: Vec<f32>,
    pub test_f1: Vec<f32>,
}

impl RunResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, train: &EpochMetrics, test: &EpochMetrics) {
        self.train_loss.push(train.loss);
        self.train_acc.push(train.accuracy);
        self.train_recall.push(train.recall);
        self.train_f1.push(train.f1);
        self.test_loss.push(test.loss);
        self.test_acc.push(test.accuracy);
        self.test_recall.push(test.recall);
        self.test_f1.push(test.f1);
    }

    /// Number of completed epochs.
    pub fn len(&self) -> usize {
        self.train_loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_loss.is_empty()
    }

    pub fn series(&self) -> [(&'static str, &[f32]); 8] {
        [
            ("train_loss", self.train_loss.as_slice()),
            ("train_acc", self.train_acc.as_slice()),
            ("train_recall", self.train_recall.as_slice()),
            ("train_f1", self.train_f1.as_slice()),
            ("test_loss", self.test_loss.as_slice()),
            ("test_acc", self.test_acc.as_slice()),
            ("test_recall", self.test_recall.as_slice()),
            ("test_f1", self.test_f1.as_slice()),
        ]
    }

    /// Index of the epoch with the lowest evaluation loss.
    pub fn best_epoch(&self) -> Option<usize> {
        self.test_loss
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, &loss)| match best {
                Some((_, best_loss)) if best_loss <= loss => best,
                _ if loss.is_nan() => best,
                _ => Some((i, loss)),
            })
            .map(|(i, _)| i)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let series = self.series();

        write!(writer, "epoch")?;
        for (name, _) in &series {
            write!(writer, ",{}", name)?;
        }
        writeln!(writer)?;

        for epoch in 0..self.len() {
            write!(writer, "{}", epoch)?;
            for (_, values) in &series {
                write!(writer, ",{}", values[epoch])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}
