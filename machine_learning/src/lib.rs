pub mod arch;
pub mod error;
pub mod gradient;
mod network;
pub mod optimization;
mod sequence;
pub mod training;

pub use error::{MlErr, Result};
pub use network::Network;
pub use sequence::Sequence;
pub use training::{BackpropTrainer, ConvergenceConfig, TrainerConfig};
