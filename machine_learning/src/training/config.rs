use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Hyperparameters of a backpropagation trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    /// Factor the learning rate is multiplied by after every epoch.
    pub lr_decay: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    /// Apply a single update at the end of each epoch instead of one per sequence.
    pub batch_learning: bool,
    /// Seed for shuffling and splitting, taken from the OS when missing.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            lr_decay: 1.0,
            momentum: 0.,
            weight_decay: 0.,
            batch_learning: false,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub(crate) fn generate_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// When to stop training until convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Stop after this many epochs even if the validation error is still improving.
    pub max_epochs: Option<usize>,
    /// Size of the windows of validation errors compared to detect a plateau.
    pub continue_epochs: usize,
    /// Fraction of the dataset held out for validation.
    pub validation_proportion: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_epochs: None,
            continue_epochs: 10,
            validation_proportion: 0.25,
        }
    }
}

impl ConvergenceConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.continue_epochs == 0 {
            return Err(MlErr::Config("continue_epochs must be at least 1".into()));
        }

        if !(0.0..=1.0).contains(&self.validation_proportion) {
            return Err(MlErr::Config(format!(
                "validation_proportion must lie within [0, 1], got {}",
                self.validation_proportion
            )));
        }

        Ok(())
    }
}
