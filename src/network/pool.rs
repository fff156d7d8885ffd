//! Worker Pool
//!
//! Fixed set of threads fed through a bounded queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender, TrySendError};

use crate::error::Result;

/// Bounded pool of worker threads
///
/// `submit` never blocks: when every worker is busy and `max_pending` jobs
/// are already queued, the job is handed back to the caller.
pub struct WorkerPool<T: Send + 'static> {
    /// Job queue (None once shut down)
    sender: Option<Sender<T>>,

    /// Worker thread handles
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `workers` threads that run `handler` for each submitted job
    pub fn new<F>(workers: usize, max_pending: usize, handler: F) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let (sender, receiver) = channel::bounded::<T>(max_pending);
        let handler = Arc::new(handler);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);

            let handle = thread::Builder::new()
                .name(format!("drawvault-worker-{}", id))
                .spawn(move || {
                    for job in receiver.iter() {
                        // A panicking job must not shrink the pool
                        if panic::catch_unwind(AssertUnwindSafe(|| (*handler)(job))).is_err() {
                            tracing::error!(worker = id, "Worker job panicked");
                        }
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers: handles,
        })
    }

    /// Queue a job, handing it back if the pool is saturated
    pub fn submit(&self, job: T) -> std::result::Result<(), T> {
        let Some(sender) = &self.sender else {
            return Err(job);
        };
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
        })
    }

    /// Jobs waiting for a free worker
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, drain the queue and join every worker
    pub fn join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing the channel ends each worker's receive loop
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
