//! ---
//! bbq_section: "02-voyager-client"
//! bbq_subsection: "module"
//! bbq_type: "source"
//! bbq_scope: "test"
//! bbq_description: "In-memory connection halves for unit tests."
//! bbq_version: "v0.0.0-prealpha"
//! bbq_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::connection::{FrameSink, FrameSource};
use crate::errors::{ReadError, WriteError};

/// Sink recording every frame, optionally failing all sends.
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
    last_activity: Mutex<Instant>,
    closes: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            last_activity: Mutex::new(Instant::now()),
            closes: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let sink = Self::new();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&self, frame: &str) -> Result<(), WriteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WriteError::Closed);
        }
        self.frames.lock().push(frame.to_owned());
        *self.last_activity.lock() = Instant::now();
        Ok(())
    }

    async fn close(&self) -> Result<(), WriteError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }
}

/// Source fed from a channel; a dropped sender reads as a closed connection.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<String, ReadError>>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<Result<String, ReadError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn receive(&mut self) -> Result<String, ReadError> {
        self.rx.recv().await.unwrap_or(Err(ReadError::Closed))
    }
}
