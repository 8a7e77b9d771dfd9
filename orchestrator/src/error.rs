use std::{fmt, io};

use datasets::DatasetErr;
use machine_learning::MlErr;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before spawning any worker.
    InvalidConfig(String),
    /// The coordinator's own training state failed.
    Ml(MlErr),
    /// A worker thread couldn't be spawned.
    Spawn(io::Error),
    /// A worker hung up its channel, most likely because its thread died.
    WorkerDisconnected { worker_id: usize },
    /// A worker failed to compute its share of a batch.
    WorkerFailed { worker_id: usize, source: MlErr },
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Ml(e) => write!(f, "training error: {e}"),
            Self::Spawn(e) => write!(f, "failed to spawn worker: {e}"),
            Self::WorkerDisconnected { worker_id } => {
                write!(f, "worker {worker_id} disconnected")
            }
            Self::WorkerFailed { worker_id, source } => {
                write!(f, "worker {worker_id} error: {source}")
            }
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::WorkerFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<MlErr> for OrchestratorError {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<DatasetErr> for OrchestratorError {
    fn from(e: DatasetErr) -> Self {
        Self::Ml(e.into())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
