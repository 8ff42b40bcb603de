mod args;
mod data;
mod device;

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use args::Args;
use candle_core::DType;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use clap::Parser;
use data::Samples;
use device::get_device;
use harness::data::train_test_split;
use harness::loss::binary_cross_entropy;
use harness::network::Classifier;
use harness::{MetricsSink, RunWriter, TensorDataset, Trainer};
use log::LevelFilter;
use simplelog::{Config, SimpleLogger};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;
    let device = get_device()?;

    let samples = Samples::load(&args.data)?;
    if samples.is_empty() {
        return Err(format!("No samples found in {}", args.data.display()).into());
    }
    log::info!(
        "Loaded {} samples ({} positive) with {} features",
        samples.len(),
        samples.positives(),
        samples.num_features
    );

    let (x, y) = samples.to_tensors(&device)?;
    let (x_train, x_test, y_train, y_test) =
        train_test_split(&x, &y, args.test_ratio, Some(args.seed))?;

    let train_data =
        TensorDataset::new(x_train, y_train, args.batch_size)?.with_shuffle(args.seed);
    let test_data = TensorDataset::new(x_test, y_test, args.batch_size)?;
    log::info!(
        "Split into {} train and {} test samples",
        train_data.len(),
        test_data.len()
    );

    log::info!("Creating network");
    let varmap = VarMap::new();
    let vs = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let net = Classifier::new(&vs, samples.num_features, args.hidden_size, args.dropout)?;

    let mut opt = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: args.learning_rate,
            ..ParamsAdamW::default()
        },
    )?;

    let mut writer = match run_dir(&args) {
        Some(dir) => {
            log::info!("Logging run to {}", dir.display());
            Some(RunWriter::create(dir)?)
        }
        None => None,
    };
    let example_input = x.narrow(0, 0, 1)?;

    log::info!("Training network");
    let trainer = Trainer::new(args.epochs, args.patience).with_parameters(varmap.clone());
    let results = trainer.fit(
        &net,
        &train_data,
        &test_data,
        &mut opt,
        &binary_cross_entropy,
        &device,
        writer.as_mut().map(|w| w as &mut dyn MetricsSink),
        Some(&example_input),
    )?;

    if let Some(best) = results.best_epoch() {
        log::info!(
            "Best epoch {}: test_loss {:.4}, test_acc {:.4}, test_f1 {:.4}",
            best + 1,
            results.test_loss[best],
            results.test_acc[best],
            results.test_f1[best]
        );
    }

    let mut out = BufWriter::new(File::create(&args.output)?);
    results.write(&mut out)?;
    out.flush()?;
    log::info!("Results written to {}", args.output.display());

    if let Some(path) = &args.model {
        log::info!("Saving model");
        varmap.save(path)?;
    }

    log::info!("Done!");
    Ok(())
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::init(LevelFilter::Info, Config::default())?;

    Ok(args)
}

fn run_dir(args: &Args) -> Option<PathBuf> {
    args.log_dir.clone().or_else(|| {
        args.log.then(|| {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
            PathBuf::from("runs").join(stamp)
        })
    })
}
