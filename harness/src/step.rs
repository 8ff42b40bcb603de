//! Single passes over a batch source.
//!
//! [`train_step`] updates the model once per batch, [`eval_step`] only
//! measures it. Both report the same [`EpochMetrics`]: loss and accuracy are
//! averaged per batch, recall and F1 are support-weighted over every example
//! of the pass.

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{ModuleT, Optimizer};

use crate::data::{Batch, BatchSource};
use crate::metrics::{EpochAccumulator, EpochMetrics, EpochRecord};
use crate::progress::TrainingProgressBar;

/// Eval-mode view of a model.
///
/// Holds a shared borrow for as long as it lives, so the model cannot be
/// trained through it, and detaches every output so no gradient graph
/// survives a forward pass.
pub struct InferenceScope<'a, M: ModuleT + ?Sized> {
    model: &'a M,
}

impl<'a, M: ModuleT + ?Sized> InferenceScope<'a, M> {
    pub fn enter(model: &'a M) -> Self {
        Self { model }
    }

    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(self.model.forward_t(xs, false)?.detach())
    }
}

pub fn train_step<M, S, L, O>(
    model: &M,
    source: &S,
    loss_fn: &L,
    optimizer: &mut O,
    device: &Device,
    progress: &TrainingProgressBar,
) -> Result<EpochMetrics>
where
    M: ModuleT + ?Sized,
    S: BatchSource + ?Sized,
    L: Fn(&Tensor, &Tensor) -> Result<Tensor> + ?Sized,
    O: Optimizer,
{
    train_step_with_record(model, source, loss_fn, optimizer, device, progress)
        .map(|(metrics, _)| metrics)
}

/// Like [`train_step`], also returning the labels collected during the pass.
pub fn train_step_with_record<M, S, L, O>(
    model: &M,
    source: &S,
    loss_fn: &L,
    optimizer: &mut O,
    device: &Device,
    progress: &TrainingProgressBar,
) -> Result<(EpochMetrics, EpochRecord)>
where
    M: ModuleT + ?Sized,
    S: BatchSource + ?Sized,
    L: Fn(&Tensor, &Tensor) -> Result<Tensor> + ?Sized,
    O: Optimizer,
{
    run_pass(source, device, progress, |x, y| {
        let preds = model.forward_t(x, true)?;
        let loss = loss_fn(&preds, y)?;

        optimizer.backward_step(&loss)?;

        Ok((preds.detach(), loss))
    })
}

pub fn eval_step<M, S, L>(
    model: &M,
    source: &S,
    loss_fn: &L,
    device: &Device,
    progress: &TrainingProgressBar,
) -> Result<EpochMetrics>
where
    M: ModuleT + ?Sized,
    S: BatchSource + ?Sized,
    L: Fn(&Tensor, &Tensor) -> Result<Tensor> + ?Sized,
{
    eval_step_with_record(model, source, loss_fn, device, progress).map(|(metrics, _)| metrics)
}

/// Like [`eval_step`], also returning the labels collected during the pass.
pub fn eval_step_with_record<M, S, L>(
    model: &M,
    source: &S,
    loss_fn: &L,
    device: &Device,
    progress: &TrainingProgressBar,
) -> Result<(EpochMetrics, EpochRecord)>
where
    M: ModuleT + ?Sized,
    S: BatchSource + ?Sized,
    L: Fn(&Tensor, &Tensor) -> Result<Tensor> + ?Sized,
{
    let scope = InferenceScope::enter(model);

    run_pass(source, device, progress, |x, y| {
        let preds = scope.forward(x)?;
        let loss = loss_fn(&preds, y)?.detach();
        Ok((preds, loss))
    })
}

// Shared batch loop. `forward` returns (predictions, scalar loss) per batch.
fn run_pass<S, F>(
    source: &S,
    device: &Device,
    progress: &TrainingProgressBar,
    mut forward: F,
) -> Result<(EpochMetrics, EpochRecord)>
where
    S: BatchSource + ?Sized,
    F: FnMut(&Tensor, &Tensor) -> Result<(Tensor, Tensor)>,
{
    let mut accumulator = EpochAccumulator::new();

    for batch in source.batches() {
        let (x, y) = to_device(batch?, device)?;
        let (preds, loss) = forward(&x, &y)?;

        let loss = loss.to_dtype(DType::F32)?.to_scalar::<f32>()?;

        // Rounding a sigmoid output is a 0.5 threshold
        let classes = preds
            .to_dtype(DType::F32)?
            .round()?
            .flatten_all()?
            .to_vec1::<f32>()?;
        let targets = y.flatten_all()?.to_vec1::<f32>()?;

        accumulator.push_batch(loss, &classes, &targets);
        progress.update(accumulator.current_loss());
    }

    let (metrics, record) = accumulator.finish();
    if !metrics.loss.is_finite() {
        log::warn!("Non-finite mean loss: {}", metrics.loss);
    }

    Ok((metrics, record))
}

// Targets become an f32 column so they line up with `(N, 1)` predictions
fn to_device(batch: Batch, device: &Device) -> Result<(Tensor, Tensor)> {
    let x = batch.inputs.to_device(device)?;
    let y = batch
        .targets
        .to_device(device)?
        .to_dtype(DType::F32)?
        .flatten_all()?
        .unsqueeze(1)?;
    Ok((x, y))
}
