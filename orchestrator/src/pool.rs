use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use datasets::Dataset;
use log::{debug, warn};
use machine_learning::Network;

use crate::{
    config::ParallelConfig,
    error::{OrchestratorError, Result},
    msg::{Command, Partial, Report},
    queue::WorkQueue,
    worker::Worker,
};

struct WorkerHandle {
    commands: Sender<Command>,
    reports: Receiver<Report>,
    thread: Option<JoinHandle<()>>,
}

/// A fixed set of worker threads fed through a shared job queue.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    queue: Arc<WorkQueue>,
}

impl WorkerPool {
    /// Spawns `config.workers` threads, each with its own copy of `network`.
    ///
    /// # Errors
    /// `Spawn` if the os refuses to create a thread. The threads spawned so far are shut down.
    pub fn spawn<N>(network: &N, dataset: Arc<Dataset>, config: &ParallelConfig) -> Result<Self>
    where
        N: Network + Clone + Send + 'static,
    {
        let mut pool = Self {
            workers: Vec::with_capacity(config.workers),
            queue: Arc::new(WorkQueue::new()),
        };

        for id in 0..config.workers {
            let (cmd_tx, cmd_rx) = mpsc::channel();
            let (report_tx, report_rx) = mpsc::channel();

            let worker = Worker::new(
                id,
                network.clone(),
                Arc::clone(&dataset),
                Arc::clone(&pool.queue),
                cmd_rx,
                report_tx,
                config.poll_interval(),
            );

            let thread = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker.run())
                .map_err(OrchestratorError::Spawn)?;

            pool.workers.push(WorkerHandle {
                commands: cmd_tx,
                reports: report_rx,
                thread: Some(thread),
            });
        }

        debug!("spawned {} workers", pool.workers.len());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Computes the derivatives of the rows in `indices` with the parameters `params`.
    ///
    /// The rows are enqueued in jobs of `chunk_size` before any worker is told to start, then
    /// this blocks until every worker has reported back.
    ///
    /// # Returns
    /// The partial results of every worker, in worker order.
    ///
    /// # Errors
    /// `WorkerDisconnected` if a worker's channel is closed, `WorkerFailed` if a worker couldn't
    /// compute its share. Either way every live worker is waited for before returning so the
    /// next batch starts clean.
    pub fn run_batch(
        &mut self,
        params: &[f64],
        indices: &[usize],
        chunk_size: usize,
    ) -> Result<Vec<Partial>> {
        self.queue
            .extend(indices.chunks(chunk_size).map(<[usize]>::to_vec));

        let mut sent = Vec::with_capacity(self.workers.len());
        let mut failure = None;

        for (worker_id, worker) in self.workers.iter().enumerate() {
            let ok = worker
                .commands
                .send(Command::Params(params.to_vec()))
                .is_ok();

            if !ok {
                failure.get_or_insert(OrchestratorError::WorkerDisconnected { worker_id });
            }
            sent.push(ok);
        }

        let mut partials = Vec::with_capacity(self.workers.len());

        for (worker_id, worker) in self.workers.iter().enumerate() {
            if !sent[worker_id] {
                continue;
            }

            match worker.reports.recv() {
                Ok(Report::Done(partial)) => partials.push(partial),
                Ok(Report::Failed(source)) => {
                    warn!(worker_id = worker_id; "worker failed: {source}");
                    failure.get_or_insert(OrchestratorError::WorkerFailed { worker_id, source });
                }
                Err(_) => {
                    failure.get_or_insert(OrchestratorError::WorkerDisconnected { worker_id });
                }
            }
        }

        match failure {
            Some(e) => {
                self.queue.clear();
                Err(e)
            }
            None => Ok(partials),
        }
    }

    /// Tells every worker to stop and waits for all of them.
    pub fn shutdown(&mut self) {
        for worker in &self.workers {
            let _ = worker.commands.send(Command::Finished);
        }

        for (worker_id, worker) in self.workers.iter_mut().enumerate() {
            if let Some(thread) = worker.thread.take()
                && thread.join().is_err()
            {
                warn!(worker_id = worker_id; "worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
