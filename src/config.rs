use anyhow::{Context, bail, ensure};
use datasets::{Backend, Dataset, Item, schemas};
use machine_learning::{ConvergenceConfig, TrainerConfig, arch::layers::Dense};
use orchestrator::ParallelConfig;
use serde::Deserialize;

fn default_init_std() -> f64 {
    0.1
}

/// Everything a training run needs, read from a JSON file.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub backend: Backend,
    /// Replace every NaN in the dataset by the mean of its component before training.
    #[serde(default)]
    pub fill_nans: bool,
    #[serde(default)]
    pub trainer: TrainerConfig,
    pub mode: ModeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    Sequential {
        layers: Vec<Dense>,
        #[serde(default = "default_init_std")]
        init_std: f64,
    },
    Recurrent {
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        #[serde(default = "default_init_std")]
        init_std: f64,
    },
}

#[derive(Debug, Deserialize)]
pub struct SequenceConfig {
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<Vec<f64>>,
    #[serde(default)]
    pub importance: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetConfig {
    /// Row major `inputs ++ targets` samples.
    Inline {
        data: Vec<f64>,
        x_size: usize,
        y_size: usize,
    },
    Sequences {
        input_dim: usize,
        target_dim: usize,
        sequences: Vec<SequenceConfig>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModeConfig {
    /// Serial training for a fixed number of epochs.
    Epochs { epochs: usize },
    /// Serial training with early stopping on a held out partition.
    Convergence {
        #[serde(flatten)]
        convergence: ConvergenceConfig,
    },
    /// Parallel batch training for a fixed number of epochs.
    Parallel {
        epochs: usize,
        #[serde(default)]
        parallel: ParallelConfig,
    },
}

impl DatasetConfig {
    pub fn build(&self, backend: &Backend) -> anyhow::Result<Dataset> {
        match self {
            Self::Inline {
                data,
                x_size,
                y_size,
            } => {
                let row = x_size + y_size;
                ensure!(*x_size > 0 && *y_size > 0, "x_size and y_size must be positive");
                ensure!(
                    data.len() % row == 0,
                    "inline data has {} values, not a multiple of {row}",
                    data.len()
                );

                let (inputs, targets): (Vec<_>, Vec<_>) = data
                    .chunks_exact(row)
                    .map(|sample| {
                        let (x, y) = sample.split_at(*x_size);
                        (Item::vector(x), Item::vector(y))
                    })
                    .unzip();

                Ok(Dataset::from_iterables(
                    schemas::regression()?,
                    vec![inputs, targets],
                    backend.clone(),
                )?)
            }
            Self::Sequences {
                input_dim,
                target_dim,
                sequences,
            } => {
                let weighted = sequences.first().is_some_and(|s| s.importance.is_some());
                let mut columns = vec![Vec::new(), Vec::new()];
                if weighted {
                    columns.push(Vec::new());
                }

                for (i, seq) in sequences.iter().enumerate() {
                    columns[0].push(Item::sequence(*input_dim, &seq.inputs)?);
                    columns[1].push(Item::sequence(*target_dim, &seq.targets)?);

                    match (&seq.importance, weighted) {
                        (Some(importance), true) => {
                            columns[2].push(Item::sequence(*target_dim, importance)?);
                        }
                        (None, false) => {}
                        _ => bail!("sequence {i}: either every sequence has importance or none"),
                    }
                }

                let schema = if weighted {
                    schemas::importance_sequence_regression()?
                } else {
                    schemas::sequence_regression()?
                };

                Dataset::from_iterables(schema, columns, backend.clone())
                    .context("building the sequence dataset")
            }
        }
    }
}
