//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Receive loop classifying Voyager events and updating telemetry."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::connection::FrameSource;
use crate::errors::ParseError;
use crate::model::{ControlData, LogEvent};
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::snapshot::TelemetryStore;

/// Pause between receive iterations.
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(50);

/// Event families announced by the `Event` tag of inbound frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ControlData,
    LogEvent,
    RemoteActionResult,
    Version,
    VikingManaged,
    /// Anything else, including JSON-RPC replies without an `Event` tag.
    Other(String),
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ControlData" => EventKind::ControlData,
            "LogEvent" => EventKind::LogEvent,
            "RemoteActionResult" => EventKind::RemoteActionResult,
            "Version" => EventKind::Version,
            "VikingManaged" => EventKind::VikingManaged,
            other => EventKind::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrameHeader {
    #[serde(rename = "Event", default)]
    event: String,
}

/// Dispatcher lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Active,
    Closing,
}

/// Reads frames until the shared stop signal fires or the read side fails.
pub struct EventDispatcher<S> {
    source: S,
    store: Arc<TelemetryStore>,
    shutdown: Shutdown,
    idle_delay: Duration,
    state: DispatcherState,
}

impl<S: FrameSource> EventDispatcher<S> {
    pub fn new(source: S, store: Arc<TelemetryStore>, shutdown: Shutdown) -> Self {
        Self {
            source,
            store,
            shutdown,
            idle_delay: DEFAULT_DISPATCH_DELAY,
            state: DispatcherState::Active,
        }
    }

    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Classify one frame and apply it. Errors leave the store untouched.
    pub fn dispatch(&self, frame: &str) -> Result<EventKind, ParseError> {
        let header: FrameHeader = serde_json::from_str(frame)?;
        let kind = EventKind::from_tag(&header.event);
        let line = frame.trim_end();
        match &kind {
            EventKind::ControlData => {
                debug!(frame = line, "recv control data");
                let data = ControlData::from_frame(frame)?;
                self.store.replace(data);
            }
            EventKind::LogEvent => {
                let event = LogEvent::from_frame(frame)?;
                debug!(
                    time_info = event.time_info,
                    level = %event.level,
                    text = %event.text,
                    "recv log"
                );
            }
            EventKind::RemoteActionResult => debug!(frame = line, "recv result"),
            EventKind::Version => debug!(frame = line, "recv version"),
            EventKind::VikingManaged => debug!(frame = line, "recv viking"),
            EventKind::Other(tag) => debug!(event = %tag, frame = line, "recv not managed"),
        }
        Ok(kind)
    }

    /// Run until stopped; returns the reason the session is shutting down.
    pub async fn run(mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = self.shutdown.reason() {
                self.close(reason);
                return reason;
            }

            let received = tokio::select! {
                biased;
                reason = self.shutdown.wait() => {
                    self.close(reason);
                    return reason;
                }
                received = self.source.receive() => received,
            };

            match received {
                Ok(frame) => {
                    if let Err(err) = self.dispatch(&frame) {
                        warn!(error = %err, frame = frame.trim_end(), "discarding frame");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "read failed; stopping dispatcher");
                    self.shutdown.trigger(ShutdownReason::DispatcherStopped);
                    let reason = self
                        .shutdown
                        .reason()
                        .unwrap_or(ShutdownReason::DispatcherStopped);
                    self.close(reason);
                    return reason;
                }
            }

            tokio::time::sleep(self.idle_delay).await;
        }
    }

    fn close(&mut self, reason: ShutdownReason) {
        self.state = DispatcherState::Closing;
        debug!(?reason, state = ?self.state, "quit receive loop");
    }
}
