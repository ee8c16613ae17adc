//! Background delivery of change batches.
//!
//! LSP notifications and the filesystem watcher must not run listener work
//! (archive reloads, directory walks) on the request path. Batches are queued
//! on an unbounded channel and a single worker applies them in submission
//! order on the blocking pool, so per-listener ordering is preserved.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ChangeEvent, FileObserver};

pub type ChangeSender = mpsc::UnboundedSender<Vec<ChangeEvent>>;

/// Queue plus worker that feeds a `FileObserver`.
pub struct ChangeDispatcher {
    sender: ChangeSender,
    worker_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancellation_token: CancellationToken,
}

impl ChangeDispatcher {
    /// Creates the dispatcher and starts its worker. Must be called inside a
    /// tokio runtime.
    pub fn new(observer: FileObserver) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = Self {
            sender,
            worker_handle: Arc::new(Mutex::new(None)),
            cancellation_token: CancellationToken::new(),
        };
        dispatcher.start_worker(observer, receiver);
        dispatcher
    }

    /// Sender for producers living outside the runtime (e.g. the watcher thread).
    pub fn sender(&self) -> ChangeSender {
        self.sender.clone()
    }

    /// Queue a batch. Empty batches are dropped.
    pub fn submit(&self, batch: Vec<ChangeEvent>) {
        if batch.is_empty() {
            return;
        }
        let len = batch.len();
        if self.sender.send(batch).is_err() {
            log::warn!("Change dispatcher stopped, dropping {} events", len);
        } else {
            log::trace!("Queued {} change events", len);
        }
    }

    fn start_worker(
        &self,
        observer: FileObserver,
        mut receiver: mpsc::UnboundedReceiver<Vec<ChangeEvent>>,
    ) {
        let token = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            log::info!("Change dispatcher worker started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        log::info!("Change dispatcher worker stopped");
                        break;
                    }
                    batch = receiver.recv() => {
                        let Some(batch) = batch else {
                            break;
                        };
                        let observer = observer.clone();
                        let applied = tokio::task::spawn_blocking(move || {
                            for event in &batch {
                                observer.notify(event);
                            }
                            batch.len()
                        })
                        .await;
                        match applied {
                            Ok(count) => log::trace!("Applied {} change events", count),
                            Err(e) => log::error!("Change batch failed: {}", e),
                        }
                    }
                }
            }
        });

        if let Ok(mut guard) = self.worker_handle.lock() {
            *guard = Some(handle);
        }
    }

    /// Stops the worker. Queued batches that were not started are dropped.
    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
        if let Ok(mut guard) = self.worker_handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for ChangeDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
