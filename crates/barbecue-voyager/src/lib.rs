//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Voyager dashboard telemetry client."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
//! Client for the Voyager application server WebSocket protocol.
//!
//! A session opens one connection, enables dashboard mode, then runs a
//! receive loop that keeps the latest `ControlData` record and a heartbeat
//! loop that keeps the link alive. Callers read camera snapshots from the
//! session and stop it through one shared signal.

pub mod connection;
pub mod dashboard;
pub mod dispatcher;
pub mod errors;
pub mod heartbeat;
pub mod model;
pub mod session;
pub mod shutdown;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use connection::{connect, Connection, ConnectionReader, ConnectionWriter, FrameSink, FrameSource};
pub use dashboard::{activate_dashboard, RemoteCommand};
pub use dispatcher::{EventDispatcher, EventKind};
pub use errors::{ConnectionError, ParseError, ReadError, WriteError};
pub use heartbeat::{HeartbeatMonitor, HeartbeatReport, PollingEvent};
pub use model::{CcdPower, CcdState, ControlData, LogEvent, LogLevel};
pub use session::{start, SessionConfig, SessionHandle, SessionSummary, DEFAULT_VOYAGER_ADDRESS};
pub use shutdown::{Shutdown, ShutdownReason};
pub use snapshot::{CameraSnapshot, SnapshotReader, TelemetryStore};
