use std::{collections::VecDeque, time::Duration};

use parking_lot::{Condvar, Mutex};

/// A chunk of dataset row indices.
pub type Job = Vec<usize>;

/// Jobs shared between the coordinator and every worker.
#[derive(Debug, Default)]
pub struct WorkQueue {
    jobs: Mutex<VecDeque<Job>>,
    available: Condvar,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues every job and wakes up the waiting workers.
    pub fn extend<I>(&self, jobs: I)
    where
        I: IntoIterator<Item = Job>,
    {
        self.jobs.lock().extend(jobs);
        self.available.notify_all();
    }

    /// Dequeues the next job, waiting at most `timeout` for one to show up.
    ///
    /// # Returns
    /// The job or `None` if the queue stayed empty for the whole timeout.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Job> {
        let mut jobs = self.jobs.lock();

        if jobs.is_empty() {
            self.available
                .wait_while_for(&mut jobs, |jobs| jobs.is_empty(), timeout);
        }

        jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every pending job.
    pub fn clear(&self) {
        self.jobs.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Instant};

    use super::*;

    #[test]
    fn jobs_come_out_in_order() {
        let queue = WorkQueue::new();
        queue.extend([vec![1, 2], vec![3]]);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop_timeout(Duration::ZERO), Some(vec![1, 2]));
        assert_eq!(queue.pop_timeout(Duration::ZERO), Some(vec![3]));
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_queue_times_out() {
        let queue = WorkQueue::new();
        let start = Instant::now();

        assert_eq!(queue.pop_timeout(Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn waiting_workers_are_woken_up() {
        let queue = Arc::new(WorkQueue::new());

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_timeout(Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(10));
        queue.extend([vec![42]]);

        assert_eq!(consumer.join().unwrap(), Some(vec![42]));
    }

    #[test]
    fn every_job_is_taken_once() {
        let queue = Arc::new(WorkQueue::new());
        queue.extend((0..100).map(|i| vec![i]));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(job) = queue.pop_timeout(Duration::from_millis(10)) {
                        taken.extend(job);
                    }
                    taken
                })
            })
            .collect();

        let mut taken: Vec<_> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();

        taken.sort_unstable();
        assert_eq!(taken, (0..100).collect::<Vec<_>>());
    }
}
