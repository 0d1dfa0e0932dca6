//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Keep-alive loop and connection shutdown owner."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connection::FrameSink;
use crate::errors::WriteError;
use crate::shutdown::{Shutdown, ShutdownReason};

/// How often the idle time is checked.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
/// Idle time after which Voyager expects a polling frame.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(10);
/// Shortest tick accepted; `tokio::time::interval` rejects a zero period.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

/// `Polling` keep-alive event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingEvent {
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
    #[serde(rename = "Host", default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(rename = "Inst")]
    pub inst: i64,
}

impl PollingEvent {
    pub fn now() -> Self {
        Self {
            event: "Polling".to_owned(),
            timestamp: chrono::Utc::now().timestamp() as f64,
            host: String::new(),
            inst: 1,
        }
    }
}

/// Whether the connection has been idle long enough to need a poll.
pub fn heartbeat_due(elapsed: Duration, idle_threshold: Duration) -> bool {
    elapsed > idle_threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Running,
    Closing,
    Closed,
}

/// Outcome of a finished heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub reason: ShutdownReason,
    pub polls_sent: u64,
    pub state: HeartbeatState,
}

/// Sends polling frames while the link is idle and closes the socket on shutdown.
pub struct HeartbeatMonitor {
    sink: Arc<dyn FrameSink>,
    shutdown: Shutdown,
    interval: Duration,
    idle_threshold: Duration,
    state: HeartbeatState,
    polls_sent: u64,
}

impl HeartbeatMonitor {
    pub fn new(sink: Arc<dyn FrameSink>, shutdown: Shutdown) -> Self {
        Self {
            sink,
            shutdown,
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            state: HeartbeatState::Running,
            polls_sent: 0,
        }
    }

    /// Override the tick and idle threshold. Intervals below
    /// [`MIN_HEARTBEAT_INTERVAL`] are raised to it.
    pub fn with_timing(mut self, interval: Duration, idle_threshold: Duration) -> Self {
        if interval < MIN_HEARTBEAT_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "heartbeat interval too short; clamping"
            );
        }
        self.interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        self.idle_threshold = idle_threshold;
        self
    }

    /// Run until the shared signal fires or `interrupt` resolves.
    ///
    /// An interrupt raises the shared signal so the dispatcher stops too. Either
    /// way the close frame is sent before returning.
    pub async fn run<F>(mut self, interrupt: F) -> HeartbeatReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let reason = loop {
            tokio::select! {
                biased;
                reason = self.shutdown.wait() => break reason,
                _ = &mut interrupt => {
                    info!("interrupt received; shutting down");
                    self.shutdown.trigger(ShutdownReason::Interrupted);
                    break self.shutdown.reason().unwrap_or(ShutdownReason::Interrupted);
                }
                now = ticker.tick() => self.on_tick(now).await,
            }
        };

        self.state = HeartbeatState::Closing;
        debug!(?reason, "quit heartbeat loop");
        if let Err(err) = self.sink.close().await {
            warn!(error = %err, "write close failed");
        }
        self.state = HeartbeatState::Closed;

        HeartbeatReport {
            reason,
            polls_sent: self.polls_sent,
            state: self.state,
        }
    }

    async fn on_tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.sink.last_activity());
        if !heartbeat_due(elapsed, self.idle_threshold) {
            return;
        }
        match self.send_poll().await {
            Ok(()) => {
                self.polls_sent += 1;
                debug!(idle_ms = elapsed.as_millis() as u64, "heartbeat sent");
            }
            Err(err) => warn!(error = %err, "heartbeat send failed"),
        }
    }

    async fn send_poll(&self) -> Result<(), WriteError> {
        let frame = serde_json::to_string(&PollingEvent::now())?;
        self.sink.send(&frame).await
    }
}
