//! Query debouncer: emits a value only after input has been quiet for a
//! full window.
//!
//! The debouncer owns at most one pending timer task. A new input aborts the
//! pending task and schedules a fresh one, so emissions are replaced rather
//! than queued.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receiving end of a [`Debouncer`]; yields settled values.
pub type SettledReceiver<T> = mpsc::UnboundedReceiver<T>;

/// Cancellable quiescence timer over a stream of input values.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    ///
    /// Must be called within a tokio runtime before the first `push`.
    pub fn new(window: Duration) -> (Self, SettledReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                window,
                pending: None,
                tx,
            },
            rx,
        )
    }

    /// Record a new input value, restarting the quiescence window.
    pub fn push(&mut self, value: T) {
        self.cancel();
        let tx = self.tx.clone();
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Receiver gone means nobody is listening any more.
            let _ = tx.send(value);
        }));
    }
}

impl<T> Debouncer<T> {
    /// Drop the pending emission, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a value is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
