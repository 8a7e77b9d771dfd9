use datasets::Dataset;
use log::{debug, info};
use ndarray::ArrayView1;
use rand::{rngs::StdRng, seq::SliceRandom};

use super::TrainerConfig;
use crate::{
    MlErr, Result,
    arch::check_dim,
    gradient::{calc_derivs, evaluate_sequence},
    network::Network,
    optimization::{GradientDescent, Optimizer},
    sequence::Sequence,
};

/// Step used by the numeric gradient check.
const CHECK_EPSILON: f64 = 1e-6;

/// Trains a network on a supervised, possibly sequential, dataset by backpropagating the errors
/// through time.
pub struct BackpropTrainer<N: Network> {
    pub(super) network: N,
    pub(super) optimizer: GradientDescent,
    pub(super) config: TrainerConfig,
    pub(super) rng: StdRng,
    epochs: usize,
    gradient: Vec<f64>,
}

impl<N: Network> BackpropTrainer<N> {
    /// Creates a new `BackpropTrainer`.
    ///
    /// # Arguments
    /// * `network` - The network to train.
    /// * `config` - The hyperparameters of the training.
    pub fn new(network: N, config: TrainerConfig) -> Self {
        let size = network.size();
        let optimizer = GradientDescent::new(
            size,
            config.learning_rate,
            config.lr_decay,
            config.momentum,
        );

        Self {
            network,
            optimizer,
            rng: config.generate_rng(),
            config,
            epochs: 0,
            gradient: Vec::with_capacity(size),
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn into_network(self) -> N {
        self.network
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The amount of epochs trained so far.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// The learning rate the next update is going to use.
    pub fn learning_rate(&self) -> f64 {
        self.optimizer.learning_rate()
    }

    /// Trains the network for one epoch.
    ///
    /// Every row is visited once in a fresh random order. In online mode the parameters are
    /// updated after each sequence, in batch mode the derivatives of the whole epoch are
    /// accumulated and applied once at the end.
    ///
    /// # Returns
    /// The error of the epoch divided by its ponderation.
    pub fn train(&mut self, dataset: &Dataset) -> Result<f64> {
        let len = dataset.len()?;
        if len == 0 {
            return Err(MlErr::EmptyDataset);
        }

        self.network.reset_derivatives();
        let mut error = 0.;
        let mut ponderation = 0.;

        for idx in self.shuffled_indices(len) {
            let seq = Sequence::from_row(dataset.get(idx)?)?;
            let (e, p) = calc_derivs(&mut self.network, &seq)?;
            error += e;
            ponderation += p;

            if !self.config.batch_learning {
                self.apply_update(None)?;
                self.network.reset_derivatives();
            }
        }

        if self.config.batch_learning {
            self.apply_update(None)?;
        }

        self.finish_epoch(error, ponderation)
    }

    /// Trains the network for `epochs` epochs.
    ///
    /// # Returns
    /// The error of every epoch.
    pub fn train_epochs(&mut self, dataset: &Dataset, epochs: usize) -> Result<Vec<f64>> {
        (0..epochs).map(|_| self.train(dataset)).collect()
    }

    /// Takes one descent step with derivatives computed elsewhere.
    ///
    /// The weight decay term is subtracted before the step, exactly as in `train`.
    pub fn descend(&mut self, derivs: &[f64]) -> Result<()> {
        self.apply_update(Some(derivs))
    }

    /// Closes an epoch whose derivatives were computed elsewhere: decays the learning rate and
    /// counts the epoch.
    ///
    /// # Returns
    /// The error of the epoch divided by its ponderation.
    pub fn finish_epoch(&mut self, error: f64, ponderation: f64) -> Result<f64> {
        self.optimizer.decay_learning_rate();
        self.epochs += 1;

        if ponderation == 0. {
            return Err(MlErr::ZeroPonderation);
        }

        let error = error / ponderation;
        info!("epoch {}: total error {error}", self.epochs);
        Ok(error)
    }

    /// Returns every index below `len` in a fresh random order.
    pub fn shuffled_indices(&mut self, len: usize) -> Vec<usize> {
        let mut indices: Vec<_> = (0..len).collect();
        indices.shuffle(&mut self.rng);
        indices
    }

    /// Computes the error of the network on a dataset, running it forward only.
    ///
    /// # Returns
    /// The summed error divided by the summed ponderation, or `ZeroPonderation` if the latter
    /// is zero.
    pub fn test_on_data(&mut self, dataset: &Dataset) -> Result<f64> {
        let mut error = 0.;
        let mut ponderation = 0.;

        for row in dataset.iter()? {
            let seq = Sequence::from_row(row?)?;
            let (e, p) = evaluate_sequence(&mut self.network, &seq)?;
            error += e;
            ponderation += p;
        }

        if ponderation <= 0. {
            return Err(MlErr::ZeroPonderation);
        }

        Ok(error / ponderation)
    }

    /// Winner takes all classification of every timestep of a dataset.
    ///
    /// # Returns
    /// The index of the largest output and the index of the largest target of every timestep.
    pub fn test_on_class_data(&mut self, dataset: &Dataset) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut outputs = Vec::new();
        let mut targets = Vec::new();

        for row in dataset.iter()? {
            let seq = Sequence::from_row(row?)?;
            check_dim("sequence inputs", seq.input_dim(), self.network.input_dim())?;
            self.network.reset();

            for t in 0..seq.len() {
                let output = self.network.activate(seq.input(t))?;
                outputs.push(argmax(output.view()));
                targets.push(argmax(seq.target(t)));
            }
        }

        Ok((outputs, targets))
    }

    /// Numeric check of the backpropagated derivatives, by central differences.
    ///
    /// The numerical derivatives are negated so that they point in the same direction as the
    /// derivative accumulator.
    ///
    /// # Returns
    /// For every sequence, the `(analytical, numerical)` pair of every parameter.
    pub fn check_gradient(&mut self, dataset: &Dataset) -> Result<Vec<Vec<(f64, f64)>>> {
        let mut pairs = Vec::new();

        for row in dataset.iter()? {
            let seq = Sequence::from_row(row?)?;

            self.network.reset_derivatives();
            calc_derivs(&mut self.network, &seq)?;
            let analytical = self.network.derivs().to_vec();

            let mut numerical = Vec::with_capacity(analytical.len());
            for p in 0..analytical.len() {
                let old = self.network.params()[p];

                self.network.params_mut()[p] = old + CHECK_EPSILON;
                let (right, _) = calc_derivs(&mut self.network, &seq)?;
                self.network.params_mut()[p] = old - CHECK_EPSILON;
                let (left, _) = calc_derivs(&mut self.network, &seq)?;
                self.network.params_mut()[p] = old;

                numerical.push(-(right - left) / (2. * CHECK_EPSILON));
            }

            debug!("checked the gradient of a sequence of {} timesteps", seq.len());
            pairs.push(analytical.into_iter().zip(numerical).collect());
        }

        self.network.reset_derivatives();
        Ok(pairs)
    }

    /// Subtracts the weight decay from `derivs`, or from the network's own derivatives, and
    /// takes one optimizer step.
    fn apply_update(&mut self, derivs: Option<&[f64]>) -> Result<()> {
        let derivs = match derivs {
            Some(derivs) => derivs,
            None => self.network.derivs(),
        };

        check_dim("derivatives", derivs.len(), self.network.size())?;

        let wd = self.config.weight_decay;
        self.gradient.clear();
        self.gradient.extend(
            derivs
                .iter()
                .zip(self.network.params())
                .map(|(d, p)| d - wd * p),
        );

        self.optimizer
            .update_params(self.network.params_mut(), &self.gradient)
    }
}

/// Index of the first largest value.
fn argmax(values: ArrayView1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &x)| {
            if x > max { (i, x) } else { (best, max) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn argmax_picks_the_first_maximum() {
        assert_eq!(argmax(array![0.1, 0.7, 0.7, 0.2].view()), 1);
        assert_eq!(argmax(array![-3., -1.].view()), 1);
    }
}
