mod config;

use std::{env, fs, sync::Arc};

use anyhow::Context;
use datasets::{Dataset, helpers};
use log::info;
use machine_learning::{
    BackpropTrainer, Network,
    arch::{Recurrent, Sequential},
};
use orchestrator::ParallelBackpropTrainer;
use rand::{SeedableRng, rngs::StdRng};

use config::{ModeConfig, ModelConfig, RunConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::var("CONFIG").context("CONFIG must point to a run configuration")?;
    let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config: RunConfig = serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let mut dataset = config.dataset.build(&config.backend)?;
    if config.fill_nans {
        dataset = helpers::replace_nans_by_means(&dataset)?;
    }
    info!("loaded {} rows", dataset.len()?);

    let mut rng = match config.trainer.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    match &config.model {
        ModelConfig::Sequential { layers, init_std } => {
            let mut network = Sequential::new(layers.iter().copied())?;
            network.randomize(&mut rng, *init_std)?;
            run(network, dataset, &config)
        }
        ModelConfig::Recurrent {
            input_dim,
            hidden_dim,
            output_dim,
            init_std,
        } => {
            let mut network = Recurrent::new(*input_dim, *hidden_dim, *output_dim);
            network.randomize(&mut rng, *init_std)?;
            run(network, dataset, &config)
        }
    }
}

fn run<N>(network: N, dataset: Dataset, config: &RunConfig) -> anyhow::Result<()>
where
    N: Network + Clone + Send + 'static,
{
    info!("training a network with {} parameters", network.size());

    match &config.mode {
        ModeConfig::Epochs { epochs } => {
            let mut trainer = BackpropTrainer::new(network, config.trainer.clone());
            trainer.train_epochs(&dataset, *epochs)?;
            info!("final error: {}", trainer.test_on_data(&dataset)?);
        }
        ModeConfig::Convergence { convergence } => {
            let mut trainer = BackpropTrainer::new(network, config.trainer.clone());
            let (training, validation) = trainer.train_until_convergence(&dataset, convergence)?;
            info!(
                "converged after {} epochs: training error {:?}, best validation error {:?}",
                trainer.epochs(),
                training.last(),
                validation.iter().copied().reduce(f64::min),
            );
        }
        ModeConfig::Parallel { epochs, parallel } => {
            let dataset = Arc::new(dataset);
            let mut trainer = ParallelBackpropTrainer::new(
                network,
                Arc::clone(&dataset),
                config.trainer.clone(),
                parallel.clone(),
            )?;

            trainer.train_epochs(*epochs)?;
            info!("final error: {}", trainer.test_on_data(&dataset)?);
            trainer.shutdown();
        }
    }

    Ok(())
}
