mod config;
pub mod error;
mod msg;
mod pool;
mod queue;
mod trainer;
mod worker;

pub use config::ParallelConfig;
pub use error::{OrchestratorError, Result};
pub use msg::{Command, Partial, Report};
pub use pool::WorkerPool;
pub use queue::{Job, WorkQueue};
pub use trainer::ParallelBackpropTrainer;
pub use worker::Worker;
