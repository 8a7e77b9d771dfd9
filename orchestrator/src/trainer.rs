use std::sync::Arc;

use datasets::Dataset;
use log::{debug, info};
use machine_learning::{BackpropTrainer, MlErr, Network, TrainerConfig};

use crate::{config::ParallelConfig, error::Result, pool::WorkerPool};

/// Backpropagation trainer that spreads the derivative computation over a pool of threads.
///
/// Every epoch the rows are shuffled and cut into batches. The derivatives of a batch are
/// computed by the workers with the current parameters, summed, and applied in a single
/// descent step, so each batch behaves like batch learning over its rows.
pub struct ParallelBackpropTrainer<N: Network> {
    trainer: BackpropTrainer<N>,
    dataset: Arc<Dataset>,
    pool: WorkerPool,
    config: ParallelConfig,
}

impl<N> ParallelBackpropTrainer<N>
where
    N: Network + Clone + Send + 'static,
{
    /// Creates a new `ParallelBackpropTrainer` and spawns its workers.
    ///
    /// # Arguments
    /// * `network` - The network to train, each worker gets its own copy.
    /// * `dataset` - The training rows, shared with the workers.
    /// * `trainer_config` - Optimizer settings, `batch_learning` is ignored.
    /// * `config` - How to split the work.
    pub fn new(
        network: N,
        dataset: Arc<Dataset>,
        trainer_config: TrainerConfig,
        config: ParallelConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pool = WorkerPool::spawn(&network, Arc::clone(&dataset), &config)?;
        let trainer = BackpropTrainer::new(network, trainer_config);

        Ok(Self {
            trainer,
            dataset,
            pool,
            config,
        })
    }

    pub fn network(&self) -> &N {
        self.trainer.network()
    }

    pub fn into_network(self) -> N {
        self.trainer.into_network()
    }

    pub fn epochs(&self) -> usize {
        self.trainer.epochs()
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Trains the network for one epoch over the shared dataset.
    ///
    /// # Returns
    /// The error of the epoch divided by its ponderation.
    pub fn train(&mut self) -> Result<f64> {
        let len = self.dataset.len()?;
        if len == 0 {
            return Err(MlErr::EmptyDataset.into());
        }

        let indices = self.trainer.shuffled_indices(len);
        let mut error = 0.;
        let mut ponderation = 0.;

        for (i, batch) in indices.chunks(self.config.batch_size).enumerate() {
            let partials = self.pool.run_batch(
                self.trainer.network().params(),
                batch,
                self.config.chunk_size,
            )?;

            let mut derivs = vec![0.; self.trainer.network().size()];
            for partial in partials {
                error += partial.errors.iter().sum::<f64>();
                ponderation += partial.ponderations.iter().sum::<f64>();
                derivs
                    .iter_mut()
                    .zip(&partial.derivs)
                    .for_each(|(acc, d)| *acc += d);
            }

            debug!("batch {i}: {} rows", batch.len());
            self.trainer.descend(&derivs)?;
        }

        Ok(self.trainer.finish_epoch(error, ponderation)?)
    }

    /// Trains the network for `epochs` epochs.
    ///
    /// # Returns
    /// The error of every epoch.
    pub fn train_epochs(&mut self, epochs: usize) -> Result<Vec<f64>> {
        (0..epochs).map(|_| self.train()).collect()
    }

    /// Computes the error of the network on `dataset` on the calling thread.
    pub fn test_on_data(&mut self, dataset: &Dataset) -> Result<f64> {
        Ok(self.trainer.test_on_data(dataset)?)
    }

    /// Stops the workers. Training afterwards fails with `WorkerDisconnected`.
    pub fn shutdown(&mut self) {
        info!("shutting down {} workers", self.pool.len());
        self.pool.shutdown();
    }
}
