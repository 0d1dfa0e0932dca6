//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Error taxonomy for the Voyager client."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Initial handshake failures. The only error surfaced to callers of the session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The configured address does not form a valid `ws://` URL.
    #[error("invalid voyager address {address}: {reason}")]
    InvalidAddress {
        /// Address as supplied by the caller.
        address: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// The handshake did not complete in time.
    #[error("handshake with {url} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint being dialled.
        url: String,
        /// Configured handshake budget.
        timeout: Duration,
    },
    /// The peer refused or broke the handshake.
    #[error("unable to connect to {url}: {source}")]
    Handshake {
        /// Endpoint being dialled.
        url: String,
        /// Underlying WebSocket error.
        #[source]
        source: tungstenite::Error,
    },
}

/// Failures writing a single outbound frame.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The connection was already closed locally.
    #[error("connection closed")]
    Closed,
    /// The socket rejected the frame.
    #[error("websocket write failed: {0}")]
    Transport(#[from] tungstenite::Error),
    /// The outbound payload could not be encoded.
    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures reading from an established connection.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The peer closed the connection or the stream ended.
    #[error("connection closed by peer")]
    Closed,
    /// The socket failed while reading.
    #[error("websocket read failed: {0}")]
    Transport(#[from] tungstenite::Error),
}

/// Frames that cannot be decoded into the telemetry model.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Malformed JSON or a schema mismatch.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    /// `CCDSTAT` outside the 0..=9 enumeration.
    #[error("unknown CCD state code {0}")]
    UnknownCcdState(i64),
    /// `Type` outside the 1..=9 log level enumeration.
    #[error("unknown log level {0}")]
    UnknownLogLevel(i64),
}
