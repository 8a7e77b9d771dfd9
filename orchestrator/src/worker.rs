use std::{
    sync::{
        Arc,
        mpsc::{Receiver, RecvTimeoutError, Sender},
    },
    time::Duration,
};

use datasets::Dataset;
use log::{debug, trace};
use machine_learning::{MlErr, Network, Sequence, gradient::sequence_gradient};

use crate::{
    msg::{Command, Partial, Report},
    queue::WorkQueue,
};

/// A thread that owns a copy of the network and computes derivatives for the jobs it pulls
/// from the shared queue.
pub struct Worker<N: Network> {
    id: usize,
    network: N,
    dataset: Arc<Dataset>,
    queue: Arc<WorkQueue>,
    commands: Receiver<Command>,
    reports: Sender<Report>,
    poll_interval: Duration,
}

impl<N: Network> Worker<N> {
    pub fn new(
        id: usize,
        network: N,
        dataset: Arc<Dataset>,
        queue: Arc<WorkQueue>,
        commands: Receiver<Command>,
        reports: Sender<Report>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            network,
            dataset,
            queue,
            commands,
            reports,
            poll_interval,
        }
    }

    /// Runs the worker loop until the coordinator sends `Command::Finished` or hangs up.
    ///
    /// Every `Command::Params` is answered with exactly one `Report`.
    pub fn run(mut self) {
        debug!(worker_id = self.id; "worker started");

        loop {
            let params = match self.commands.recv_timeout(self.poll_interval) {
                Ok(Command::Params(params)) => params,
                Ok(Command::Finished) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            };

            let report = match self.process_batch(&params) {
                Ok(partial) => Report::Done(partial),
                Err(e) => Report::Failed(e),
            };

            if self.reports.send(report).is_err() {
                break;
            }
        }

        debug!(worker_id = self.id; "worker finished");
    }

    /// Loads `params` and pulls jobs until the queue stays empty for a whole poll interval.
    fn process_batch(&mut self, params: &[f64]) -> Result<Partial, MlErr> {
        let size = self.network.size();
        if params.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "parameters",
                got: params.len(),
                expected: size,
            });
        }
        self.network.params_mut().copy_from_slice(params);

        let mut partial = Partial {
            derivs: vec![0.; size],
            ..Default::default()
        };

        while let Some(job) = self.queue.pop_timeout(self.poll_interval) {
            trace!(worker_id = self.id; "processing {} rows", job.len());

            for idx in job {
                let seq = Sequence::from_row(self.dataset.get(idx)?)?;
                let (error, ponderation, derivs) = sequence_gradient(&mut self.network, &seq)?;

                partial.errors.push(error);
                partial.ponderations.push(ponderation);
                partial
                    .derivs
                    .iter_mut()
                    .zip(derivs)
                    .for_each(|(acc, d)| *acc += d);
            }
        }

        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, thread};

    use datasets::{Backend, Item, schemas};
    use machine_learning::{
        arch::{Sequential, activations::ActFn, layers::Dense},
        gradient::calc_derivs,
    };

    use super::*;

    fn dataset() -> Arc<Dataset> {
        let inputs = (0..6).map(|i| Item::vector([i as f64 / 6.]));
        let targets = (0..6).map(|i| Item::vector([1. - i as f64 / 6.]));
        let dataset = Dataset::from_iterables(
            schemas::regression().unwrap(),
            vec![inputs.collect::<Vec<_>>(), targets.collect::<Vec<_>>()],
            Backend::Array,
        )
        .unwrap();

        Arc::new(dataset)
    }

    #[test]
    fn worker_answers_every_batch() {
        let dataset = dataset();
        let network = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
        let params = vec![0.5, -0.25];

        let queue = Arc::new(WorkQueue::new());
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let worker = Worker::new(
            0,
            network.clone(),
            Arc::clone(&dataset),
            Arc::clone(&queue),
            cmd_rx,
            report_tx,
            Duration::from_millis(10),
        );
        let handle = thread::spawn(move || worker.run());

        queue.extend([vec![0, 1, 2], vec![3, 4, 5]]);
        cmd_tx.send(Command::Params(params.clone())).unwrap();

        let Report::Done(partial) = report_rx.recv().unwrap() else {
            panic!("worker failed");
        };

        let mut expected = network;
        expected.params_mut().copy_from_slice(&params);
        expected.reset_derivatives();
        let mut error = 0.;
        for idx in 0..6 {
            let seq = Sequence::from_row(dataset.get(idx).unwrap()).unwrap();
            error += calc_derivs(&mut expected, &seq).unwrap().0;
        }

        assert_eq!(partial.errors.len(), 6);
        assert_eq!(partial.ponderations, vec![1.; 6]);
        assert!((partial.errors.iter().sum::<f64>() - error).abs() < 1e-12);
        for (got, want) in partial.derivs.iter().zip(expected.derivs()) {
            assert!((got - want).abs() < 1e-12);
        }

        cmd_tx.send(Command::Finished).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn wrong_params_are_reported() {
        let network = Sequential::new([Dense::new((1, 1), ActFn::Identity)]).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();

        let worker = Worker::new(
            3,
            network,
            dataset(),
            Arc::new(WorkQueue::new()),
            cmd_rx,
            report_tx,
            Duration::from_millis(10),
        );
        let handle = thread::spawn(move || worker.run());

        cmd_tx.send(Command::Params(vec![1.; 5])).unwrap();
        assert!(matches!(
            report_rx.recv().unwrap(),
            Report::Failed(MlErr::SizeMismatch { got: 5, expected: 2, .. })
        ));

        drop(cmd_tx);
        handle.join().unwrap();
    }
}
