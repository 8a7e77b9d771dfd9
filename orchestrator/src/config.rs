use std::{num::NonZeroUsize, thread, time::Duration};

use serde::Deserialize;

use crate::error::{OrchestratorError, Result};

/// How the parallel trainer splits up an epoch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Rows per job handed to a worker.
    pub chunk_size: usize,
    /// Rows whose derivatives are summed before each descent step.
    pub batch_size: usize,
    /// How long an idle worker waits on its channel or on the queue before checking again.
    pub poll_interval_ms: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            chunk_size: 1000,
            batch_size: 10000,
            poll_interval_ms: 100,
        }
    }
}

impl ParallelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let zero = [
            ("workers", self.workers),
            ("chunk_size", self.chunk_size),
            ("batch_size", self.batch_size),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        if let Some((name, _)) = zero {
            return Err(OrchestratorError::InvalidConfig(format!(
                "{name} must be positive"
            )));
        }

        Ok(())
    }
}
