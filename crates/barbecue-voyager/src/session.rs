//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Session wiring: connect, activate, spawn loops, join on shutdown."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::connection::{self, ConnectionWriter, FrameSink, DEFAULT_HANDSHAKE_TIMEOUT};
use crate::dashboard::activate_dashboard;
use crate::dispatcher::{EventDispatcher, DEFAULT_DISPATCH_DELAY};
use crate::errors::ConnectionError;
use crate::heartbeat::{
    HeartbeatMonitor, HeartbeatReport, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_IDLE_THRESHOLD,
};
use crate::shutdown::{Shutdown, ShutdownReason};
use crate::snapshot::{CameraSnapshot, SnapshotReader, TelemetryStore};

/// Default Voyager application server endpoint.
pub const DEFAULT_VOYAGER_ADDRESS: &str = "127.0.0.1:5950";

type Interrupt = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Timing and endpoint settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// `host:port` of the Voyager application server.
    pub address: String,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub idle_threshold: Duration,
    pub dispatch_delay: Duration,
    /// Stop the session on Ctrl-C.
    pub handle_interrupt: bool,
}

impl SessionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VOYAGER_ADDRESS.to_owned(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            handle_interrupt: false,
        }
    }
}

/// Summary returned once both loops have been joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: ShutdownReason,
    pub polls_sent: u64,
}

/// Connect to Voyager, enable the dashboard feed and start both loops.
///
/// Only the handshake can fail; a failed activation is logged and the session
/// keeps running.
pub async fn start(config: SessionConfig) -> Result<SessionHandle, ConnectionError> {
    let connection = connection::connect(&config.address, config.handshake_timeout).await?;
    let url = connection.url().clone();
    let (writer, reader) = connection.into_split();

    if let Err(err) = activate_dashboard(writer.as_ref()).await {
        warn!(error = %err, "dashboard activation failed");
    }

    let store = Arc::new(TelemetryStore::new());
    let shutdown = Shutdown::new();

    let dispatcher = EventDispatcher::new(reader, store.clone(), shutdown.clone())
        .with_idle_delay(config.dispatch_delay);
    let dispatcher = tokio::spawn(dispatcher.run());

    let sink: Arc<dyn FrameSink> = writer.clone();
    let monitor = HeartbeatMonitor::new(sink, shutdown.clone())
        .with_timing(config.heartbeat_interval, config.idle_threshold);
    let heartbeat = tokio::spawn(monitor.run(interrupt_future(config.handle_interrupt)));

    info!(url = %url, "voyager session started");
    Ok(SessionHandle {
        url,
        writer,
        store,
        shutdown,
        dispatcher,
        heartbeat,
    })
}

fn interrupt_future(enabled: bool) -> Interrupt {
    if !enabled {
        return Box::pin(std::future::pending());
    }
    Box::pin(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "unable to listen for interrupt");
            std::future::pending::<()>().await;
        }
    })
}

/// Context object owning the connection, telemetry store and loop tasks.
pub struct SessionHandle {
    url: Url,
    writer: Arc<ConnectionWriter>,
    store: Arc<TelemetryStore>,
    shutdown: Shutdown,
    dispatcher: JoinHandle<ShutdownReason>,
    heartbeat: JoinHandle<HeartbeatReport>,
}

impl SessionHandle {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader::new(self.store.clone())
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        self.reader().read()
    }

    /// Reason the session is stopping, if it already is.
    pub fn stop_reason(&self) -> Option<ShutdownReason> {
        self.shutdown.reason()
    }

    /// Resolve once any party has raised the stop signal.
    pub async fn stopped(&self) -> ShutdownReason {
        self.shutdown.clone().wait().await
    }

    /// Stop both loops, join them and make sure the close frame went out.
    pub async fn shutdown(self) -> SessionSummary {
        self.shutdown.trigger(ShutdownReason::Requested);

        if let Err(err) = self.dispatcher.await {
            error!(error = %err, "dispatcher task join error");
        }
        let polls_sent = match self.heartbeat.await {
            Ok(report) => report.polls_sent,
            Err(err) => {
                error!(error = %err, "heartbeat task join error");
                0
            }
        };
        if let Err(err) = self.writer.close().await {
            debug!(error = %err, "close after join failed");
        }

        let reason = self.shutdown.reason().unwrap_or(ShutdownReason::Requested);
        info!(?reason, polls_sent, "voyager session closed");
        SessionSummary { reason, polls_sent }
    }
}
