use std::error::Error;

use candle_core::{Device, Result as CandleResult, Tensor};
use candle_nn::{ModuleT, Optimizer, VarMap};

use crate::data::BatchSource;
use crate::early_stopping::{EarlyStopping, DEFAULT_PATIENCE};
use crate::metrics::EpochMetrics;
use crate::progress::TrainingProgressBar;
use crate::results::RunResults;
use crate::sink::{MetricsSink, ModelGraph};
use crate::step::{eval_step, train_step};

const DEFAULT_EPOCHS: usize = 100;

pub struct Trainer {
    epochs: usize,
    patience: u64,
    show_progress: bool,
    varmap: Option<VarMap>,
}

impl Trainer {
    pub fn new(epochs: usize, patience: u64) -> Self {
        Self {
            epochs,
            patience,
            show_progress: true,
            varmap: None,
        }
    }

    /// Disables the per-epoch progress bar.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Parameters to list in the graph record sent to the metrics sink.
    pub fn with_parameters(mut self, varmap: VarMap) -> Self {
        self.varmap = Some(varmap);
        self
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn patience(&self) -> u64 {
        self.patience
    }

    /// Trains for up to `epochs` epochs, stopping early once the evaluation
    /// loss fails to improve for `patience` consecutive epochs.
    ///
    /// Scalars go to `sink` only when `example_input` is also given. The sink
    /// is closed once, after the last epoch. Any error aborts the run and
    /// discards the results gathered so far.
    #[allow(clippy::too_many_arguments)]
    pub fn fit<M, S, E, L, O>(
        &self,
        model: &M,
        train_data: &S,
        eval_data: &E,
        optimizer: &mut O,
        loss_fn: &L,
        device: &Device,
        mut sink: Option<&mut dyn MetricsSink>,
        example_input: Option<&Tensor>,
    ) -> Result<RunResults, Box<dyn Error>>
    where
        M: ModuleT + ?Sized,
        S: BatchSource + ?Sized,
        E: BatchSource + ?Sized,
        L: Fn(&Tensor, &Tensor) -> CandleResult<Tensor> + ?Sized,
        O: Optimizer,
    {
        let mut results = RunResults::new();
        let mut stopping = EarlyStopping::new(self.patience);
        let mut graph_logged = false;

        for epoch in 0..self.epochs {
            let progress = self.progress_bar(train_data.num_batches())?;

            let train = train_step(model, train_data, loss_fn, optimizer, device, &progress)?;
            let test = eval_step(
                model,
                eval_data,
                loss_fn,
                device,
                &TrainingProgressBar::hidden(),
            )?;

            progress.finish(test.loss, train.loss);
            log_epoch(epoch, &train, &test);

            results.push(&train, &test);
            stopping.update(test.loss);

            if let (Some(sink), Some(example)) = (sink.as_deref_mut(), example_input) {
                write_scalars(sink, epoch, &train, &test)?;

                if !graph_logged {
                    sink.add_graph(&self.graph(model, example, device)?)?;
                    graph_logged = true;
                }
            }

            if stopping.should_stop() {
                log::info!("Early stopping triggered after {} epochs.", epoch + 1);
                break;
            }
        }

        if let Some(sink) = sink {
            sink.close()?;
        }

        Ok(results)
    }

    fn progress_bar(&self, num_batches: usize) -> Result<TrainingProgressBar, Box<dyn Error>> {
        if self.show_progress {
            TrainingProgressBar::new(num_batches)
        } else {
            Ok(TrainingProgressBar::hidden())
        }
    }

    fn graph<M: ModuleT + ?Sized>(
        &self,
        model: &M,
        example: &Tensor,
        device: &Device,
    ) -> CandleResult<ModelGraph> {
        let graph = ModelGraph::trace(model, &example.to_device(device)?)?;
        Ok(match &self.varmap {
            Some(varmap) => graph.with_parameters(varmap),
            None => graph,
        })
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(DEFAULT_EPOCHS, DEFAULT_PATIENCE)
    }
}

fn log_epoch(epoch: usize, train: &EpochMetrics, test: &EpochMetrics) {
    log::info!(
        "Epoch: {} | train_loss: {:.4} | train_acc: {:.4} | train_recall: {:.4} | train_f1: {:.4} | \
         test_loss: {:.4} | test_acc: {:.4} | test_recall: {:.4} | test_f1: {:.4}",
        epoch + 1,
        train.loss,
        train.accuracy,
        train.recall,
        train.f1,
        test.loss,
        test.accuracy,
        test.recall,
        test.f1,
    );
}

fn write_scalars(
    sink: &mut dyn MetricsSink,
    epoch: usize,
    train: &EpochMetrics,
    test: &EpochMetrics,
) -> std::io::Result<()> {
    sink.add_scalars(
        "Loss",
        &[("train_loss", train.loss), ("test_loss", test.loss)],
        epoch,
    )?;
    sink.add_scalars(
        "Accuracy",
        &[("train_acc", train.accuracy), ("test_acc", test.accuracy)],
        epoch,
    )?;
    sink.add_scalars(
        "Recall",
        &[("train_recall", train.recall), ("test_recall", test.recall)],
        epoch,
    )?;
    sink.add_scalars(
        "F1-Score",
        &[("train_f1", train.f1), ("test_f1", test.f1)],
        epoch,
    )
}
