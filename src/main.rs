use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xview::{Evaluator, StubSiamese, SyntheticDataset, Trainer, XviewConfig, runtime};

const TRAIN_LOCATIONS: usize = 512;
const VALIDATION_LOCATIONS: usize = 256;

/// `xview [CONFIG] [WEIGHTS]`: train then evaluate, or with `WEIGHTS`
/// evaluate that checkpoint without training. `-` selects the default config.
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next().filter(|arg| arg != "-") {
        Some(path) => XviewConfig::from_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => XviewConfig::default(),
    };
    let checkpoint = args.next().map(PathBuf::from);

    init_tracing(&config);
    let threads = runtime::init_compute(config.runtime.threads);
    tracing::info!(threads, name = ?config.name, "starting synthetic cross-view run");

    let train = SyntheticDataset::new(TRAIN_LOCATIONS, config.training.batch_size);
    let validation =
        SyntheticDataset::new(VALIDATION_LOCATIONS, config.training.batch_size).with_prefix("val");
    let mut net = StubSiamese::new().with_jitter(2.0);
    let evaluator = Evaluator::from_config(&config);

    if let Some(weights) = checkpoint {
        let report = evaluator
            .evaluate_checkpoint(&mut net, &weights, &validation)
            .with_context(|| format!("evaluating checkpoint {}", weights.display()))?;
        println!("{report}");
        return Ok(());
    }

    let summary = Trainer::from_config(&config)
        .fit(&mut net, &train, Some(&validation))
        .context("training failed")?;
    if let Some(loss) = summary.final_loss() {
        tracing::info!(epochs = summary.epochs.len(), final_loss = loss, "training finished");
    }

    let report = evaluator
        .evaluate(&net, &validation)
        .context("evaluation failed")?;
    println!("{report}");

    Ok(())
}

fn init_tracing(config: &XviewConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true);
    if config.runtime.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
