use approx::assert_abs_diff_eq;
use datasets::{Backend, Dataset, Item, schemas};
use machine_learning::{
    BackpropTrainer, ConvergenceConfig, MlErr, Network, Result, TrainerConfig,
    arch::{Recurrent, Sequential, activations::ActFn, layers::Dense},
};
use ndarray::{Array1, ArrayView1, array};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// A single parameter network whose output is the parameter itself and whose derivative is
/// always one, so every online update with a learning rate of one moves it up by one.
struct Counter {
    params: Vec<f64>,
    derivs: Vec<f64>,
}

impl Counter {
    fn new() -> Self {
        Self {
            params: vec![0.],
            derivs: vec![0.],
        }
    }
}

impl Network for Counter {
    fn input_dim(&self) -> usize {
        1
    }

    fn output_dim(&self) -> usize {
        1
    }

    fn activate(&mut self, _input: ArrayView1<f64>) -> Result<Array1<f64>> {
        Ok(array![self.params[0]])
    }

    fn back_activate(&mut self, _out_err: ArrayView1<f64>) -> Result<Array1<f64>> {
        self.derivs[0] += 1.;
        Ok(array![0.])
    }

    fn reset(&mut self) {}

    fn reset_derivatives(&mut self) {
        self.derivs[0] = 0.;
    }

    fn params(&self) -> &[f64] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn derivs(&self) -> &[f64] {
        &self.derivs
    }
}

fn config(learning_rate: f64) -> TrainerConfig {
    TrainerConfig {
        learning_rate,
        seed: Some(7),
        ..TrainerConfig::default()
    }
}

fn constant_targets(rows: usize, target: f64) -> Dataset {
    Dataset::from_iterables(
        schemas::regression().unwrap(),
        vec![
            vec![Item::vector([0.]); rows],
            vec![Item::vector([target]); rows],
        ],
        Backend::Array,
    )
    .unwrap()
}

fn linear_dataset() -> Dataset {
    let xs = [-1., 0., 1., 2.];
    Dataset::from_iterables(
        schemas::regression().unwrap(),
        vec![
            xs.iter().map(|&x| Item::vector([x])).collect::<Vec<_>>(),
            xs.iter().map(|&x| Item::vector([2. * x + 1.])).collect(),
        ],
        Backend::Array,
    )
    .unwrap()
}

fn random_rows(rng: &mut StdRng, rows: usize) -> Vec<[f64; 2]> {
    (0..rows)
        .map(|_| [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)])
        .collect()
}

#[test]
fn convergence_restores_the_best_parameters() {
    let mut trainer = BackpropTrainer::new(Counter::new(), config(1.));
    let dataset = constant_targets(2, 5.);

    let convergence = ConvergenceConfig {
        max_epochs: None,
        continue_epochs: 3,
        validation_proportion: 0.5,
    };

    let (train_errs, valid_errs) = trainer
        .train_until_convergence(&dataset, &convergence)
        .unwrap();

    // The parameter walks 1, 2, ..., 9 and the validation error bottoms out at 5.
    assert_eq!(trainer.network().params(), [5.]);
    assert_eq!(valid_errs.len(), 10);
    assert_eq!(valid_errs[0], 12.5);
    assert_eq!(valid_errs[5], 0.);
    assert_eq!(valid_errs[9], 8.);
    assert_eq!(train_errs.len(), 10);
    assert_eq!(*train_errs.last().unwrap(), 0.);
}

#[test]
fn convergence_stops_at_max_epochs() {
    let mut trainer = BackpropTrainer::new(Counter::new(), config(1.));
    let dataset = constant_targets(2, 5.);

    let convergence = ConvergenceConfig {
        max_epochs: Some(2),
        continue_epochs: 3,
        validation_proportion: 0.5,
    };

    let (train_errs, valid_errs) = trainer
        .train_until_convergence(&dataset, &convergence)
        .unwrap();

    assert_eq!(trainer.network().params(), [3.]);
    assert_eq!(trainer.epochs(), 3);
    assert_eq!(train_errs.len(), 4);
    assert_eq!(valid_errs.len(), 4);
}

#[test]
fn convergence_needs_both_partitions() {
    let mut trainer = BackpropTrainer::new(Counter::new(), config(1.));
    let dataset = constant_targets(1, 5.);

    let err = trainer
        .train_until_convergence(&dataset, &ConvergenceConfig::default())
        .unwrap_err();

    assert!(matches!(err, MlErr::DatasetTooSmall { .. }));
}

#[test]
fn batch_learning_applies_one_update_per_epoch() {
    let net = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
    let mut trainer = BackpropTrainer::new(
        net,
        TrainerConfig {
            batch_learning: true,
            ..config(0.1)
        },
    );

    let error = trainer.train(&linear_dataset()).unwrap();

    // With zero weights the outputs are zero: targets -1, 1, 3, 5.
    assert_abs_diff_eq!(error, (1. + 1. + 9. + 25.) / 2. / 4., epsilon = 1e-12);

    // dw = sum(x * y) = 1 + 0 + 3 + 10, db = sum(y) = 8.
    let params = trainer.network().params();
    assert_abs_diff_eq!(params[0], 1.4, epsilon = 1e-12);
    assert_abs_diff_eq!(params[1], 0.8, epsilon = 1e-12);
}

#[test]
fn online_learning_fits_a_line() {
    let net = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
    let mut trainer = BackpropTrainer::new(net, config(0.05));
    let dataset = linear_dataset();

    let errors = trainer.train_epochs(&dataset, 300).unwrap();
    assert!(errors[299] < errors[0]);

    let params = trainer.network().params();
    assert_abs_diff_eq!(params[0], 2., epsilon = 1e-3);
    assert_abs_diff_eq!(params[1], 1., epsilon = 1e-3);
    assert!(trainer.test_on_data(&dataset).unwrap() < 1e-6);
}

#[test]
fn weight_decay_and_lr_decay() {
    let mut net = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
    net.params_mut().copy_from_slice(&[1., 0.]);

    let mut trainer = BackpropTrainer::new(
        net,
        TrainerConfig {
            lr_decay: 0.5,
            weight_decay: 1.,
            ..config(0.1)
        },
    );

    // Inputs of zero and targets matching the bias leave only the decay term.
    let dataset = constant_targets(1, 0.);
    trainer.train(&dataset).unwrap();

    assert_abs_diff_eq!(trainer.network().params()[0], 0.9, epsilon = 1e-12);
    assert_abs_diff_eq!(trainer.learning_rate(), 0.05, epsilon = 1e-12);
}

#[test]
fn empty_and_degenerate_datasets() {
    let net = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
    let mut trainer = BackpropTrainer::new(net, config(0.1));

    let empty = Dataset::from_sizes(schemas::regression().unwrap(), &[1, 1], Backend::Array).unwrap();
    assert!(matches!(trainer.train(&empty), Err(MlErr::EmptyDataset)));
    assert!(matches!(trainer.test_on_data(&empty), Err(MlErr::ZeroPonderation)));

    let mut unimportant = Dataset::from_sizes(
        schemas::importance_sequence_regression().unwrap(),
        &[1, 1, 1],
        Backend::List,
    )
    .unwrap();

    unimportant
        .append_row(vec![
            Item::sequence(1, [[1.], [2.]]).unwrap(),
            Item::sequence(1, [[1.], [1.]]).unwrap(),
            Item::sequence(1, [[0.], [0.]]).unwrap(),
        ])
        .unwrap();

    assert!(matches!(
        trainer.test_on_data(&unimportant),
        Err(MlErr::ZeroPonderation)
    ));
}

#[test]
fn class_data_is_winner_takes_all() {
    let mut net = Sequential::new([Dense::new((2, 2), ActFn::Identity)]).unwrap();
    net.params_mut().copy_from_slice(&[1., 0., 0., 1., 0., 0.]);
    let mut trainer = BackpropTrainer::new(net, config(0.1));

    let dataset = Dataset::from_iterables(
        schemas::regression().unwrap(),
        vec![
            vec![Item::vector([1., 0.]), Item::vector([0., 1.])],
            vec![Item::vector([0., 1.]), Item::vector([0., 1.])],
        ],
        Backend::Array,
    )
    .unwrap();

    let (outputs, targets) = trainer.test_on_class_data(&dataset).unwrap();
    assert_eq!(outputs, [0, 1]);
    assert_eq!(targets, [1, 1]);
}

#[test]
fn sequential_gradient_matches_finite_differences() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut net = Sequential::new([
        Dense::new((2, 3), ActFn::Tanh),
        Dense::new((3, 2), ActFn::Sigmoid),
    ])
    .unwrap();
    net.randomize(&mut rng, 0.5).unwrap();

    let dataset = Dataset::from_iterables(
        schemas::regression().unwrap(),
        vec![
            random_rows(&mut rng, 3).into_iter().map(Item::vector).collect::<Vec<_>>(),
            random_rows(&mut rng, 3).into_iter().map(Item::vector).collect(),
        ],
        Backend::Array,
    )
    .unwrap();

    let mut trainer = BackpropTrainer::new(net, config(0.1));
    let checks = trainer.check_gradient(&dataset).unwrap();

    assert_eq!(checks.len(), 3);
    for (analytical, numerical) in checks.into_iter().flatten() {
        assert_abs_diff_eq!(analytical, numerical, epsilon = 1e-7);
    }
}

#[test]
fn recurrent_gradient_matches_finite_differences() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut net = Recurrent::new(2, 3, 2);
    net.randomize(&mut rng, 0.5).unwrap();

    let mut dataset = Dataset::from_sizes(
        schemas::importance_sequence_regression().unwrap(),
        &[2, 2, 2],
        Backend::Array,
    )
    .unwrap();

    for len in [4, 1, 3] {
        dataset
            .append_row(vec![
                Item::sequence(2, random_rows(&mut rng, len)).unwrap(),
                Item::sequence(2, random_rows(&mut rng, len)).unwrap(),
                Item::sequence(2, vec![[1., 0.5]; len]).unwrap(),
            ])
            .unwrap();
    }

    let mut trainer = BackpropTrainer::new(net, config(0.1));
    let checks = trainer.check_gradient(&dataset).unwrap();

    assert_eq!(checks.len(), 3);
    for (analytical, numerical) in checks.into_iter().flatten() {
        assert_abs_diff_eq!(analytical, numerical, epsilon = 1e-7);
    }
}

#[test]
fn recurrent_network_learns_to_echo() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut net = Recurrent::new(1, 4, 1);
    net.randomize(&mut rng, 0.3).unwrap();

    // The target at each timestep is the input of the previous one.
    let mut dataset = Dataset::from_sizes(
        schemas::sequence_regression().unwrap(),
        &[1, 1],
        Backend::Array,
    )
    .unwrap();

    for i in 0..8 {
        let inputs: Vec<[f64; 1]> = (0..5).map(|t| [((i * 5 + t) % 3) as f64 - 1.]).collect();
        let targets: Vec<[f64; 1]> = std::iter::once([0.])
            .chain(inputs.iter().take(4).copied())
            .collect();

        dataset
            .append_row(vec![
                Item::sequence(1, &inputs).unwrap(),
                Item::sequence(1, &targets).unwrap(),
            ])
            .unwrap();
    }

    let mut trainer = BackpropTrainer::new(
        net,
        TrainerConfig {
            momentum: 0.5,
            ..config(0.05)
        },
    );

    let before = trainer.test_on_data(&dataset).unwrap();
    trainer.train_epochs(&dataset, 200).unwrap();
    let after = trainer.test_on_data(&dataset).unwrap();

    assert!(after < before, "{after} is not below {before}");
}
