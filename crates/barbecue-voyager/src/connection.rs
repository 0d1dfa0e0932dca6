//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "code"
//! bbq_description: "Voyager WebSocket connection: handshake, serialised writer and frame reader."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::errors::{ConnectionError, ReadError, WriteError};

/// Budget for the opening handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

const FRAME_TERMINATOR: &str = "\r\n";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write side of a Voyager connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Send one text frame; the line terminator is appended by the sink.
    async fn send(&self, frame: &str) -> Result<(), WriteError>;
    /// Send a normal-closure close frame and release the socket. Idempotent.
    async fn close(&self) -> Result<(), WriteError>;
    /// Instant of the last successful send.
    fn last_activity(&self) -> Instant;
}

/// Read side of a Voyager connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next complete data frame.
    async fn receive(&mut self) -> Result<String, ReadError>;
}

/// Build the `ws://<address>/` endpoint for a Voyager host.
pub fn endpoint_url(address: &str) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidAddress {
        address: address.to_owned(),
        reason,
    };
    let url = Url::parse(&format!("ws://{address}/")).map_err(|err| invalid(err.to_string()))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_owned()));
    }
    Ok(url)
}

/// Open the single connection to Voyager.
pub async fn connect(
    address: &str,
    handshake_timeout: Duration,
) -> Result<Connection, ConnectionError> {
    let url = endpoint_url(address)?;
    debug!(url = %url, "connecting to voyager");

    let (stream, _response) = match timeout(handshake_timeout, connect_async(url.as_str())).await
    {
        Ok(Ok(pair)) => pair,
        Ok(Err(source)) => {
            return Err(ConnectionError::Handshake {
                url: url.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(ConnectionError::Timeout {
                url: url.to_string(),
                timeout: handshake_timeout,
            })
        }
    };
    info!(url = %url, "connected to voyager");

    let (sink, stream) = stream.split();
    Ok(Connection {
        url,
        writer: Arc::new(ConnectionWriter::new(sink)),
        reader: ConnectionReader { stream },
    })
}

/// Established connection, split into its serialised writer and its reader.
pub struct Connection {
    url: Url,
    writer: Arc<ConnectionWriter>,
    reader: ConnectionReader,
}

impl Connection {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn into_split(self) -> (Arc<ConnectionWriter>, ConnectionReader) {
        (self.writer, self.reader)
    }
}

/// Serialised write path. Every frame goes through one lock so concurrent
/// senders never interleave, and last activity is stamped under that lock.
pub struct ConnectionWriter {
    sink: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    last_activity: parking_lot::Mutex<Instant>,
    closed: AtomicBool,
}

impl ConnectionWriter {
    fn new(sink: SplitSink<WsStream, Message>) -> Self {
        Self {
            sink: tokio::sync::Mutex::new(sink),
            last_activity: parking_lot::Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl FrameSink for ConnectionWriter {
    async fn send(&self, frame: &str) -> Result<(), WriteError> {
        let mut sink = self.sink.lock().await;
        if self.is_closed() {
            return Err(WriteError::Closed);
        }
        sink.send(Message::Text(format!("{frame}{FRAME_TERMINATOR}")))
            .await?;
        *self.last_activity.lock() = Instant::now();
        debug!(frame, "send");
        Ok(())
    }

    async fn close(&self) -> Result<(), WriteError> {
        let mut sink = self.sink.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let sent = sink
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            })))
            .await;
        if let Err(err) = sink.close().await {
            debug!(error = %err, "socket release reported an error");
        }
        sent?;
        debug!("close frame sent");
        Ok(())
    }

    fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }
}

/// Read path owned by the dispatcher.
pub struct ConnectionReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for ConnectionReader {
    async fn receive(&mut self) -> Result<String, ReadError> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(text),
                Message::Binary(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Message::Close(frame) => {
                    debug!(?frame, "close frame received");
                    return Err(ReadError::Closed);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Err(ReadError::Closed)
    }
}
