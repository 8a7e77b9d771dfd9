use datasets::Dataset;
use log::info;

use super::{BackpropTrainer, ConvergenceConfig};
use crate::{MlErr, Result, network::Network};

impl<N: Network> BackpropTrainer<N> {
    /// Trains the network until the validation error stops improving.
    ///
    /// A random `validation_proportion` of the dataset is held out. After every epoch the
    /// validation error is measured and the parameters that achieved the lowest one are kept.
    /// Training stops once `max_epochs` is exceeded, or once the smallest of the latest
    /// `continue_epochs` validation errors is larger than the largest of the `continue_epochs`
    /// before them. Either way the best parameters are restored.
    ///
    /// # Returns
    /// The training errors, ending with the error on the whole training partition after the
    /// best parameters are restored, and the validation errors, starting with the one of the
    /// untrained network.
    pub fn train_until_convergence(
        &mut self,
        dataset: &Dataset,
        config: &ConvergenceConfig,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        config.validate()?;

        let too_small = || MlErr::DatasetTooSmall {
            validation_proportion: config.validation_proportion,
        };

        let (training, validation) =
            dataset.split_with_proportion(1. - config.validation_proportion, &mut self.rng)?;

        if training.is_empty()? || validation.is_empty()? {
            return Err(too_small());
        }

        let mut best_params = self.network.params().to_vec();
        let mut best_verr = self.test_on_data(&validation)?;
        let mut train_errs = Vec::new();
        let mut valid_errs = vec![best_verr];
        let mut epochs = 0;
        let c = config.continue_epochs;

        loop {
            train_errs.push(self.train(&training)?);
            let verr = self.test_on_data(&validation)?;
            valid_errs.push(verr);

            // One update is always done.
            if epochs == 0 || verr < best_verr {
                best_verr = verr;
                best_params.copy_from_slice(self.network.params());
            }

            if config.max_epochs.is_some_and(|max| epochs >= max) {
                info!("reached the maximum of {} epochs", epochs + 1);
                break;
            }

            epochs += 1;

            let n = valid_errs.len();
            if n >= 2 * c {
                let old = &valid_errs[n - 2 * c..n - c];
                let new = &valid_errs[n - c..];

                let old_max = old.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let new_min = new.iter().copied().fold(f64::INFINITY, f64::min);

                if new_min > old_max {
                    info!("validation error went up for {c} epochs, best was {best_verr}");
                    break;
                }
            }
        }

        self.network.params_mut().copy_from_slice(&best_params);
        train_errs.push(self.test_on_data(&training)?);

        Ok((train_errs, valid_errs))
    }
}
