mod backprop;
mod config;
mod convergence;

pub use backprop::BackpropTrainer;
pub use config::{ConvergenceConfig, TrainerConfig};
