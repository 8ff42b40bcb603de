use std::cell::Cell;

use candle_core::{Device, Result, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap, SGD};

use super::{separable, Logistic};
use crate::data::TensorDataset;
use crate::loss::binary_cross_entropy;
use crate::sink::MemorySink;
use crate::trainer::Trainer;
use crate::DEFAULT_PATIENCE;

const TRAIN_LOSS: f32 = 0.5;

/// Loss that ignores the model and replays `eval_losses`, one per epoch.
///
/// Expects one train batch and one eval batch per epoch, so calls alternate
/// between training and evaluation.
fn scripted_loss(
    eval_losses: Vec<f32>,
    fail_on_call: Option<usize>,
) -> impl Fn(&Tensor, &Tensor) -> Result<Tensor> {
    let calls = Cell::new(0usize);

    move |pred: &Tensor, _target: &Tensor| {
        let call = calls.get();
        calls.set(call + 1);

        if fail_on_call == Some(call) {
            candle_core::bail!("scripted failure on call {}", call);
        }

        let value = if call % 2 == 0 {
            TRAIN_LOSS
        } else {
            eval_losses
                .get(call / 2)
                .or(eval_losses.last())
                .copied()
                .unwrap_or(0.0)
        };

        // Keeps the graph connected to the parameters with a zero gradient
        pred.sum_all()?.affine(0.0, value as f64)
    }
}

struct Fixture {
    varmap: VarMap,
    model: Logistic,
    optimizer: SGD,
    train: TensorDataset,
    eval: TensorDataset,
}

fn fixture() -> Result<Fixture> {
    let varmap = VarMap::new();
    let model = Logistic::new(&varmap, 1)?;
    let optimizer = SGD::new(varmap.all_vars(), 0.1)?;

    Ok(Fixture {
        varmap,
        model,
        optimizer,
        train: separable(4, 4)?,
        eval: separable(4, 4)?,
    })
}

#[test]
fn test_early_stopping_after_patience() -> Result<()> {
    let mut f = fixture()?;
    let loss = scripted_loss(vec![1.0, 0.9, 0.95, 0.95, 0.95, 0.1, 0.1], None);

    let results = Trainer::new(10, 3)
        .quiet()
        .fit(
            &f.model,
            &f.train,
            &f.eval,
            &mut f.optimizer,
            &loss,
            &Device::Cpu,
            None,
            None,
        )
        .unwrap();

    assert_eq!(results.len(), 5);
    for (name, values) in results.series() {
        assert_eq!(values.len(), 5, "series {}", name);
    }
    assert_eq!(results.test_loss, vec![1.0, 0.9, 0.95, 0.95, 0.95]);
    assert_eq!(results.train_loss, vec![TRAIN_LOSS; 5]);
    assert_eq!(results.best_epoch(), Some(1));
    Ok(())
}

#[test]
fn test_runs_all_epochs_while_improving() -> Result<()> {
    let mut f = fixture()?;
    let loss = scripted_loss(vec![0.9, 0.8, 0.7, 0.6, 0.5], None);

    let results = Trainer::new(3, 5)
        .quiet()
        .fit(
            &f.model,
            &f.train,
            &f.eval,
            &mut f.optimizer,
            &loss,
            &Device::Cpu,
            None,
            None,
        )
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.test_loss, vec![0.9, 0.8, 0.7]);
    Ok(())
}

#[test]
fn test_sink_receives_every_completed_epoch() -> Result<()> {
    let mut f = fixture()?;
    let loss = scripted_loss(vec![1.0, 0.9, 0.95, 0.95, 0.95], None);
    let example = Tensor::zeros((1, 1), candle_core::DType::F32, &Device::Cpu)?;
    let mut sink = MemorySink::new();

    let results = Trainer::new(10, 3)
        .quiet()
        .with_parameters(f.varmap.clone())
        .fit(
            &f.model,
            &f.train,
            &f.eval,
            &mut f.optimizer,
            &loss,
            &Device::Cpu,
            Some(&mut sink),
            Some(&example),
        )
        .unwrap();

    assert_eq!(results.len(), 5);

    // Four groups per epoch, including the epoch that triggered the stop
    assert_eq!(sink.scalars.len(), 4 * 5);
    let tags: Vec<&str> = sink.scalars[..4]
        .iter()
        .map(|g| g.main_tag.as_str())
        .collect();
    assert_eq!(tags, vec!["Loss", "Accuracy", "Recall", "F1-Score"]);

    let test_losses = sink.values("test_loss");
    assert_eq!(
        test_losses,
        vec![(0, 1.0), (1, 0.9), (2, 0.95), (3, 0.95), (4, 0.95)]
    );

    assert_eq!(sink.graphs.len(), 1);
    assert_eq!(sink.graphs[0].input_shape, vec![1, 1]);
    assert_eq!(sink.graphs[0].output_shape, vec![1, 1]);
    assert_eq!(sink.graphs[0].num_parameters(), 2);
    assert_eq!(sink.closes, 1);
    Ok(())
}

#[test]
fn test_sink_without_example_input_is_only_closed() -> Result<()> {
    let mut f = fixture()?;
    let loss = scripted_loss(vec![0.5, 0.4], None);
    let mut sink = MemorySink::new();

    let results = Trainer::new(2, DEFAULT_PATIENCE)
        .quiet()
        .fit(
            &f.model,
            &f.train,
            &f.eval,
            &mut f.optimizer,
            &loss,
            &Device::Cpu,
            Some(&mut sink),
            None,
        )
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(sink.scalars.is_empty());
    assert!(sink.graphs.is_empty());
    assert_eq!(sink.closes, 1);
    Ok(())
}

#[test]
fn test_failure_aborts_run() -> Result<()> {
    let mut f = fixture()?;
    // Call 3 is the evaluation of the second epoch
    let loss = scripted_loss(vec![0.5, 0.4, 0.3], Some(3));
    let mut sink = MemorySink::new();
    let example = Tensor::zeros((1, 1), candle_core::DType::F32, &Device::Cpu)?;

    let result = Trainer::new(3, DEFAULT_PATIENCE).quiet().fit(
        &f.model,
        &f.train,
        &f.eval,
        &mut f.optimizer,
        &loss,
        &Device::Cpu,
        Some(&mut sink),
        Some(&example),
    );

    assert!(result.is_err());
    // Only the first epoch reached the sink
    assert_eq!(sink.scalars.len(), 4);
    Ok(())
}

#[test]
fn test_training_reduces_loss() -> Result<()> {
    let varmap = VarMap::new();
    let model = Logistic::new(&varmap, 1)?;
    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: 0.1,
            ..ParamsAdamW::default()
        },
    )?;
    let train = separable(64, 16)?.with_shuffle(42);
    let eval = separable(20, 8)?;

    let results = Trainer::new(30, 30)
        .quiet()
        .fit(
            &model,
            &train,
            &eval,
            &mut optimizer,
            &binary_cross_entropy,
            &Device::Cpu,
            None,
            None,
        )
        .unwrap();

    assert_eq!(results.len(), 30);
    assert!(results.train_loss[29] < results.train_loss[0]);
    assert!(results.test_loss[29] < results.test_loss[0]);
    assert!(results.test_acc[29] > 0.9, "acc {}", results.test_acc[29]);
    assert!(optimizer.learning_rate() > 0.0);
    Ok(())
}
