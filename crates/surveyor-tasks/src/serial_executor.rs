//! Single-writer actor for state that must not be shared across threads.
//!
//! [`SerialExecutor`] owns a piece of mutable state on a dedicated OS thread
//! and runs submitted closures against it strictly in submission order.
//! Replies travel back over oneshot channels, so action failures are
//! ordinary return values and never take the worker down. A worker thread
//! (rather than a tokio task) keeps blocking I/O off the async runtime and
//! suits connection handles that are `Send` but not `Sync`.

use std::thread;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::errors::{ExecutorError, Result};

/// Queue depth for pending jobs.
const QUEUE_DEPTH: usize = 256;

/// Error type accepted from state initializers.
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Worker startup progress, observed through a watch channel.
enum ReadyState {
    Starting,
    Ready,
    Failed(String),
}

/// Linearizing executor that owns `S` on a dedicated worker thread.
///
/// Jobs submitted through [`SerialExecutor::submit`] run FIFO, one at a
/// time. [`SerialExecutor::shutdown`] closes the queue, drains every job
/// already accepted, then joins the worker.
pub struct SerialExecutor<S> {
    name: String,
    tx: Mutex<Option<mpsc::Sender<Job<S>>>>,
    ready_rx: watch::Receiver<ReadyState>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<S: 'static> SerialExecutor<S> {
    /// Spawn the worker thread and run `init` on it to produce the state.
    ///
    /// Returns as soon as the thread exists; await [`SerialExecutor::ready`]
    /// to learn whether initialization succeeded.
    pub fn spawn<F>(name: impl Into<String>, init: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<S, InitError> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let (ready_tx, ready_rx) = watch::channel(ReadyState::Starting);

        let worker_name = name.clone();
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&worker_name, init, &ready_tx, rx))
            .map_err(|source| ExecutorError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            tx: Mutex::new(Some(tx)),
            ready_rx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Resolve once the worker has finished initializing its state.
    ///
    /// Returns [`ExecutorError::InitFailed`] when the initializer reported
    /// an error; the worker has already exited in that case.
    pub async fn ready(&self) -> Result<()> {
        let mut rx = self.ready_rx.clone();
        loop {
            match &*rx.borrow_and_update() {
                ReadyState::Ready => return Ok(()),
                ReadyState::Failed(message) => {
                    return Err(ExecutorError::InitFailed {
                        name: self.name.clone(),
                        message: message.clone(),
                    });
                }
                ReadyState::Starting => {}
            }
            if rx.changed().await.is_err() {
                // Worker gone without reporting: it panicked during init.
                return Err(ExecutorError::WorkerExited {
                    name: self.name.clone(),
                });
            }
        }
    }

    /// Run `job` against the owned state and return its result.
    ///
    /// Jobs execute strictly in submission order. A job that needs to report
    /// failure should return a `Result` value; the error travels back to the
    /// caller and the worker keeps serving.
    pub async fn submit<R, F>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self.tx.lock().clone();
        let Some(sender) = sender else {
            return Err(ExecutorError::QueueClosed {
                name: self.name.clone(),
            });
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let boxed: Job<S> = Box::new(move |state| {
            let _ = reply_tx.send(job(state));
        });

        if sender.send(boxed).await.is_err() {
            return Err(self.exit_error());
        }
        reply_rx.await.map_err(|_| self.exit_error())
    }

    /// Close the queue, drain every accepted job, and join the worker.
    ///
    /// Jobs already in the queue still run to completion; submissions after
    /// this call fail with [`ExecutorError::QueueClosed`]. Safe to call more
    /// than once.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().take());
        let handle = self.worker.lock().take();
        let Some(handle) = handle else { return };

        let name = self.name.clone();
        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(())) => tracing::debug!(executor = %name, "worker drained and joined"),
            Ok(Err(_)) => tracing::warn!(executor = %name, "worker panicked before join"),
            Err(e) => tracing::warn!(executor = %name, error = %e, "failed to join worker"),
        }
    }

    /// Distinguish "worker died" from "queue closed" for a failed send.
    fn exit_error(&self) -> ExecutorError {
        let finished = self
            .worker
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished());
        if finished {
            ExecutorError::WorkerExited {
                name: self.name.clone(),
            }
        } else {
            ExecutorError::QueueClosed {
                name: self.name.clone(),
            }
        }
    }
}

/// Worker body: initialize the state, report readiness, then serve jobs
/// until every sender is gone.
fn worker_loop<S, F>(
    name: &str,
    init: F,
    ready_tx: &watch::Sender<ReadyState>,
    mut rx: mpsc::Receiver<Job<S>>,
) where
    F: FnOnce() -> std::result::Result<S, InitError>,
{
    let mut state = match init() {
        Ok(state) => {
            let _ = ready_tx.send(ReadyState::Ready);
            state
        }
        Err(e) => {
            tracing::error!(executor = %name, error = %e, "state initialization failed");
            let _ = ready_tx.send(ReadyState::Failed(e.to_string()));
            return;
        }
    };

    tracing::debug!(executor = %name, "worker ready");
    while let Some(job) = rx.blocking_recv() {
        job(&mut state);
    }
    tracing::debug!(executor = %name, "queue closed, worker exiting");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
