//! Tokio-backed memoizing annotation handle.
//!
//! Annotations are expensive computations (classifier calls, generated
//! hand-off lines) dispatched once at the start of a turn and consumed
//! synchronously by whichever component first needs them. [`SpawnedAnnotation`]
//! bridges the async producer and the synchronous turn protocol: the future
//! runs on a tokio runtime while the turn proceeds, the first `resolve` call
//! blocks until the value (or the deadline) arrives, and every later call
//! returns the memoized result.

use parley_domain::context::{Annotation, AnnotationHandle};
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;
use tracing::warn;

enum CellState {
    /// Still waiting for the producer task.
    Pending(mpsc::Receiver<Option<Annotation>>),
    /// Resolved (or failed); `resolve` is now a cheap clone.
    Ready(Option<Annotation>),
}

/// An annotation produced by a spawned async task, memoized on first access.
///
/// A timed-out or panicked producer degrades to `None`; the turn never
/// aborts because an annotation is unavailable.
pub struct SpawnedAnnotation {
    cell: Mutex<CellState>,
    timeout: Duration,
}

impl SpawnedAnnotation {
    /// Dispatch `producer` on the given runtime and return the handle.
    ///
    /// The producer is raced against `timeout` inside the task, so the
    /// deadline holds even when nothing ever calls `resolve`.
    pub fn spawn<F>(handle: &tokio::runtime::Handle, timeout: Duration, producer: F) -> Self
    where
        F: std::future::Future<Output = Option<Annotation>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        handle.spawn(async move {
            let result = match tokio::time::timeout(timeout, producer).await {
                Ok(value) => value,
                Err(_) => {
                    warn!("Annotation producer timed out after {:?}", timeout);
                    None
                }
            };
            // The receiver may already have given up; that is fine.
            let _ = tx.send(result);
        });

        Self {
            cell: Mutex::new(CellState::Pending(rx)),
            timeout,
        }
    }

    /// An already-resolved handle, for tests and synchronous producers.
    pub fn ready(annotation: Annotation) -> Self {
        Self {
            cell: Mutex::new(CellState::Ready(Some(annotation))),
            timeout: Duration::ZERO,
        }
    }
}

impl AnnotationHandle for SpawnedAnnotation {
    fn resolve(&self) -> Option<Annotation> {
        let Ok(mut cell) = self.cell.lock() else {
            return None;
        };

        if let CellState::Ready(value) = &*cell {
            return value.clone();
        }

        let value = match &*cell {
            CellState::Pending(rx) => {
                // Small grace on top of the producer-side deadline so the
                // normal path is decided by the task, not this receive.
                let deadline = self.timeout + Duration::from_millis(50);
                match rx.recv_timeout(deadline) {
                    Ok(value) => value,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        warn!("Annotation resolution timed out after {:?}", deadline);
                        None
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        warn!("Annotation producer dropped without a result");
                        None
                    }
                }
            }
            CellState::Ready(value) => value.clone(),
        };

        *cell = CellState::Ready(value.clone());
        value
    }
}
