//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Cooperative stop signal shared by the session loops."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::sync::Arc;

use tokio::sync::watch;

/// Why the session is stopping. The first reason raised wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The caller asked the session to stop.
    Requested,
    /// Operator interrupt (Ctrl-C).
    Interrupted,
    /// The dispatcher lost the read side of the connection.
    DispatcherStopped,
}

/// Cloneable handle over one shared stop signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Raise the signal. Returns `false` when another reason was already raised.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    /// Non-blocking check.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.rx.borrow()
    }

    /// Wait until the signal is raised.
    pub async fn wait(&mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = *self.rx.borrow_and_update() {
                return reason;
            }
            // The sender lives in `self`, so the channel cannot close underneath us.
            if self.rx.changed().await.is_err() {
                return ShutdownReason::Requested;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reason_wins() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.reason(), None);
        assert!(shutdown.trigger(ShutdownReason::DispatcherStopped));
        assert!(!shutdown.trigger(ShutdownReason::Requested));
        assert_eq!(shutdown.reason(), Some(ShutdownReason::DispatcherStopped));
    }

    #[tokio::test]
    async fn clones_observe_trigger() {
        let shutdown = Shutdown::new();
        let mut waiter = shutdown.clone();
        let task = tokio::spawn(async move { waiter.wait().await });
        shutdown.trigger(ShutdownReason::Interrupted);
        assert_eq!(task.await.expect("join"), ShutdownReason::Interrupted);
    }
}
