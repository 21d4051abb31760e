//! # Listener Supervision
//!
//! Owns the task handle and cancellation token of every per-source listener.
//!
//! Each spawn is stamped with a generation number. A listener that stops on
//! its own (stream ended, consume failed) reports a [`SourceClosed`] carrying
//! that generation; the discovery loop hands it back to [`ListenerSupervisor::reap`],
//! which only acts when the generation still matches. A notice from a task
//! that was already replaced is therefore ignored.
//!
//! An announcement that arrives while the tracked task is still draining is
//! remembered on the handle, so the closure that follows can restart the
//! source instead of dropping it.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use shared_types::SourceId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::service::listener::{CloseReason, SourceListener};

/// Notice sent by a listener task that stopped without being cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceClosed {
    pub source: SourceId,
    pub generation: u64,
    pub reason: CloseReason,
}

/// What [`ListenerSupervisor::reap`] did with a closure notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaped {
    /// The notice belongs to a task that was already replaced.
    Stale,
    /// The tracked task was removed.
    Closed,
    /// The tracked task was removed after its source announced itself again.
    Reannounced,
}

struct ListenerHandle {
    generation: u64,
    reannounced: bool,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Spawns and tracks per-source listener tasks.
pub struct ListenerSupervisor {
    root: CancellationToken,
    listeners: HashMap<SourceId, ListenerHandle>,
    next_generation: u64,
    closed_tx: mpsc::UnboundedSender<SourceClosed>,
}

impl ListenerSupervisor {
    /// Create a supervisor whose tasks are children of `root`.
    ///
    /// The receiver yields a notice each time a task stops on its own.
    pub fn new(root: CancellationToken) -> (Self, mpsc::UnboundedReceiver<SourceClosed>) {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            root,
            listeners: HashMap::new(),
            next_generation: 0,
            closed_tx,
        };
        (supervisor, closed_rx)
    }

    /// Spawn `listener` and return its generation.
    ///
    /// A task already tracked for the same source is cancelled and replaced.
    pub fn spawn(&mut self, listener: SourceListener) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let source = listener.source().clone();
        let cancel = self.root.child_token();

        let span = info_span!("source_listener", source = %source, generation);
        let task_cancel = cancel.clone();
        let task_source = source.clone();
        let closed_tx = self.closed_tx.clone();
        let task = tokio::spawn(
            async move {
                let reason = listener.run_for(task_cancel).await;
                if reason == CloseReason::Cancelled {
                    return;
                }
                let notice = SourceClosed {
                    source: task_source,
                    generation,
                    reason,
                };
                if closed_tx.send(notice).is_err() {
                    debug!("Supervisor gone; closure not reported");
                }
            }
            .instrument(span),
        );

        let handle = ListenerHandle {
            generation,
            reannounced: false,
            cancel,
            task,
        };
        if let Some(previous) = self.listeners.insert(source, handle) {
            previous.cancel.cancel();
        }
        generation
    }

    /// Drop the entry a closure notice refers to.
    ///
    /// A notice whose generation no longer matches the tracked task is
    /// [`Reaped::Stale`] and changes nothing.
    pub fn reap(&mut self, closed: &SourceClosed) -> Reaped {
        match self.listeners.get(&closed.source) {
            Some(handle) if handle.generation == closed.generation => {
                let reannounced = handle.reannounced;
                self.listeners.remove(&closed.source);
                if reannounced {
                    Reaped::Reannounced
                } else {
                    Reaped::Closed
                }
            }
            _ => Reaped::Stale,
        }
    }

    /// Note that `source` announced itself while its task was tracked.
    pub fn mark_reannounced(&mut self, source: &SourceId) -> bool {
        match self.listeners.get_mut(source) {
            Some(handle) => {
                handle.reannounced = true;
                true
            }
            None => false,
        }
    }

    /// Whether the tracked task for `source` is still running.
    #[must_use]
    pub fn is_running(&self, source: &SourceId) -> bool {
        self.listeners
            .get(source)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Stop tracking `source`, cancelling its task if it is still running.
    pub fn forget(&mut self, source: &SourceId) -> bool {
        match self.listeners.remove(source) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of tracked tasks.
    #[must_use]
    pub fn active(&self) -> usize {
        self.listeners.len()
    }

    /// Cancel every task and wait up to `grace` for them to finish.
    ///
    /// Tasks still running after the grace period are aborted.
    pub async fn shutdown(&mut self, grace: Duration) {
        if self.listeners.is_empty() {
            return;
        }
        let handles: Vec<ListenerHandle> = self.listeners.drain().map(|(_, h)| h).collect();
        let count = handles.len();
        for handle in &handles {
            handle.cancel.cancel();
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.task.abort_handle()).collect();
        let tasks = handles.into_iter().map(|h| h.task);
        match tokio::time::timeout(grace, join_all(tasks)).await {
            Ok(_) => debug!(count, "All listeners stopped"),
            Err(_) => {
                warn!(count, ?grace, "Listeners did not stop in time; aborting");
                for abort in aborts {
                    abort.abort();
                }
            }
        }
    }
}
