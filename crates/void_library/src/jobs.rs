//! Job lists
//!
//! A [`JobList`] runs submitted closures on worker threads and lets the
//! submitter block until every one of them has finished. Lists can be
//! nested: a job may create its own list and wait on it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

pub struct JobList {
    pending: Arc<AtomicUsize>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

/// Marks a job finished even if it panics
struct Completion {
    pending: Arc<AtomicUsize>,
    done_tx: Sender<()>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        let _ = self.done_tx.send(());
    }
}

impl JobList {
    pub fn new() -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            done_tx,
            done_rx,
        }
    }

    /// Run `job` on a worker thread
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let completion = Completion {
            pending: Arc::clone(&self.pending),
            done_tx: self.done_tx.clone(),
        };

        let spawned = thread::Builder::new()
            .name("void-library-job".to_string())
            .spawn(move || {
                let _completion = completion;
                job();
            });

        if let Err(e) = spawned {
            // the closure (and its completion) was dropped with the error
            warn!("Failed to spawn job thread: {}", e);
        }
    }

    /// Whether any submitted job is still running
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Block until every submitted job has finished
    pub fn wait(&self) {
        while self.is_busy() {
            if self.done_rx.recv().is_err() {
                break;
            }
        }
    }
}

impl Default for JobList {
    fn default() -> Self {
        Self::new()
    }
}
