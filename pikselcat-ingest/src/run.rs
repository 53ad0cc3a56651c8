//! Handle to a cancellable background run.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::IngestError;

/// Capacity of the event channel between a run and its caller.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events that can end a run.
pub trait RunEvent: Send + 'static {
    /// Returns true for `Completed` and `Cancelled`.
    fn is_terminal(&self) -> bool;
}

/// A run executing on its own task.
///
/// Events arrive in order over a bounded channel. Every run ends with exactly
/// one terminal event unless the handle is dropped first.
#[derive(Debug)]
pub struct RunHandle<E> {
    events: mpsc::Receiver<E>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl<E: RunEvent> RunHandle<E> {
    /// Spawns `body` with a sink and the run's token.
    pub fn spawn<F, Fut>(token: CancellationToken, body: F) -> Self
    where
        F: FnOnce(EventSink<E>, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(body(EventSink { tx }, token.clone()));
        Self {
            events,
            token,
            task,
        }
    }

    /// Requests cancellation. Takes effect at the run's next yield point.
    pub fn cancel(&self) {
        trace!("Run cancellation requested");
        self.token.cancel();
    }

    /// A token that cancels this run, for use from other tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Receives the next event. `None` once the run has ended.
    pub async fn next_event(&mut self) -> Option<E> {
        self.events.recv().await
    }

    /// Drains events until the terminal one and returns everything received.
    pub async fn collect(mut self) -> Vec<E> {
        let mut out = Vec::new();
        while let Some(event) = self.events.recv().await {
            let terminal = event.is_terminal();
            out.push(event);
            if terminal {
                break;
            }
        }
        out
    }

    /// Drains events and returns the terminal one.
    pub async fn finish(mut self) -> Option<E> {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Waits for the background task to exit.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::TaskFailed` if the task panicked.
    pub async fn join(self) -> Result<(), IngestError> {
        drop(self.events);
        self.task.await?;
        Ok(())
    }
}

/// Sending half used by a run body.
#[derive(Debug)]
pub struct EventSink<E> {
    tx: mpsc::Sender<E>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> EventSink<E> {
    /// Sends an event. Returns false if the caller is gone.
    pub async fn send(&self, event: E) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Waits one scheduling tick, returning early on cancellation.
pub async fn tick(delay: Option<std::time::Duration>, token: &CancellationToken) {
    match delay {
        Some(delay) => {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = token.cancelled() => {}
            }
        }
        None => tokio::task::yield_now().await,
    }
}
