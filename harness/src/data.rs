use std::cell::Cell;

use candle_core::{Result, Tensor};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// One `(inputs, targets)` pair. Targets hold one 0/1 label per example.
#[derive(Clone, Debug)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
}

pub type Batches<'a> = Box<dyn Iterator<Item = Result<Batch>> + 'a>;

/// A finite source of batches that can be iterated again every epoch.
pub trait BatchSource {
    /// Starts a fresh pass over the data.
    fn batches(&self) -> Batches<'_>;

    fn num_batches(&self) -> usize;
}

/// Batches rows of an in-memory `(inputs, targets)` tensor pair.
pub struct TensorDataset {
    inputs: Tensor,
    targets: Tensor,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    passes: Cell<u64>,
}

impl TensorDataset {
    pub fn new(inputs: Tensor, targets: Tensor, batch_size: usize) -> Result<Self> {
        let (num_inputs, num_targets) = (inputs.dim(0)?, targets.dim(0)?);
        if num_inputs != num_targets {
            candle_core::bail!(
                "inputs have {} rows but targets have {}",
                num_inputs,
                num_targets
            );
        }

        Ok(Self {
            inputs,
            targets,
            batch_size: batch_size.max(1),
            shuffle_seed: None,
            passes: Cell::new(0),
        })
    }

    /// Reshuffles row order on every pass. Each pass uses its own seed
    /// derived from `seed`, so runs are reproducible.
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn order(&self) -> Option<Vec<u32>> {
        let seed = self.shuffle_seed?;
        let pass = self.passes.get();
        self.passes.set(pass + 1);

        let mut order: Vec<u32> = (0..self.len() as u32).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(pass)));
        Some(order)
    }
}

impl BatchSource for TensorDataset {
    fn batches(&self) -> Batches<'_> {
        let num_samples = self.len();
        let batch_size = self.batch_size;
        let order = self.order();

        Box::new((0..num_samples).step_by(batch_size).map(move |start| {
            let len = batch_size.min(num_samples - start);

            let (inputs, targets) = match &order {
                Some(order) => {
                    let idx = Tensor::from_slice(
                        &order[start..start + len],
                        (len,),
                        self.inputs.device(),
                    )?;
                    (
                        self.inputs.index_select(&idx, 0)?,
                        self.targets.index_select(&idx, 0)?,
                    )
                }
                None => (
                    self.inputs.narrow(0, start, len)?,
                    self.targets.narrow(0, start, len)?,
                ),
            };

            Ok(Batch { inputs, targets })
        }))
    }

    fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }
}

pub fn train_test_split(
    x: &Tensor,
    y: &Tensor,
    split: f64,
    random_seed: Option<u64>,
) -> Result<(Tensor, Tensor, Tensor, Tensor)> {
    let num_samples = x.dim(0)?;
    let num_test = (num_samples as f64 * split.clamp(0.0, 1.0)) as usize;
    let num_train = num_samples - num_test;

    let mut indices = Vec::with_capacity(num_samples);
    indices.extend(0..num_samples as i64);

    if let Some(seed) = random_seed {
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    }

    let train_idx = Tensor::from_slice(&indices[..num_train], (num_train,), x.device())?;
    let test_idx = Tensor::from_slice(&indices[num_train..], (num_test,), x.device())?;

    let x_train = x.index_select(&train_idx, 0)?;
    let x_test = x.index_select(&test_idx, 0)?;
    let y_train = y.index_select(&train_idx, 0)?;
    let y_test = y.index_select(&test_idx, 0)?;

    Ok((x_train, x_test, y_train, y_test))
}
