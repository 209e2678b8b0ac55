use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

pub mod config;
pub mod mock;
pub mod websocket;

pub use config::ChannelConfig;
use websocket::WebSocketTransport;

use crate::panel::PanelSurface;
use crate::protocol::UpdateEnvelope;
use crate::telemetry::logging::frame_preview;

pub const STATUS_CONNECTED: &str = "SPI trigger connected!";
pub const STATUS_ERROR: &str = "Connection error";

/// Lifecycle of the single realtime channel instance, observable through a
/// watch handle.
///
/// Before `connect` there is no channel at all, and a capability error
/// leaves it that way permanently. `Closed` is terminal; a fresh channel
/// needs a fresh bootstrap. Errors are an orthogonal signal (status text
/// plus log), not a resting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("realtime channel is not open")]
    NotOpen,
    #[error("no usable realtime transport: {0}")]
    Capability(String),
    #[error("channel connect failed: {0}")]
    Connect(String),
    #[error("failed to encode update frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("channel transport failed: {0}")]
    Transport(String),
}

/// Something the transport reported from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Frame(Vec<u8>),
    Error(String),
    Closed,
}

/// Seam between the channel manager and the wire, so tests can run the
/// manager over an in-memory transport.
#[async_trait]
pub trait ChannelTransport: Send + 'static {
    /// Queue handle for outbound text frames.
    fn frame_sender(&self) -> mpsc::UnboundedSender<String>;

    /// Next lifecycle event; `None` once the transport is gone.
    async fn next_event(&mut self) -> Option<ChannelEvent>;
}

/// Send capability handed to parameter handlers.
///
/// Sending is synchronous from the caller's view: the frame is serialized
/// and queued before the call returns, so envelopes stay ordered with edits.
#[derive(Clone)]
#[derive(Debug)]
pub struct ChannelHandle {
    frames: mpsc::UnboundedSender<String>,
    status: watch::Receiver<ChannelStatus>,
}

impl ChannelHandle {
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Serializes the envelope and queues it as one text frame.
    ///
    /// Sending anywhere other than `Open` is refused rather than silently
    /// dropped; there is no queued-until-open behavior.
    pub fn send(&self, envelope: &UpdateEnvelope) -> Result<(), ChannelError> {
        if self.status() != ChannelStatus::Open {
            return Err(ChannelError::NotOpen);
        }
        let frame = envelope.to_frame()?;
        tracing::trace!(target: "spitrig::channel", len = frame.len(), "outbound frame");
        self.frames
            .send(frame)
            .map_err(|_| ChannelError::Transport("channel writer task is gone".into()))
    }
}

/// Owns the channel instance and its lifecycle wiring. At most one exists
/// per session; only the [`ChannelHandle`] send capability leaks outward.
#[derive(Debug)]
pub struct ChannelManager {
    handle: ChannelHandle,
    reader_task: Option<tokio::task::JoinHandle<()>>,
}

impl ChannelManager {
    /// Connects the realtime channel. Called once, after the bootstrap
    /// sequencer reports that the session started.
    pub async fn connect(
        config: &ChannelConfig,
        surface: Arc<dyn PanelSurface>,
    ) -> Result<Self, ChannelError> {
        let url = config.build_url();
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            // No realtime transport can speak this URL; fatal, never retried.
            tracing::error!(target: "spitrig::channel", %url, "no usable realtime transport");
            return Err(ChannelError::Capability(format!(
                "unsupported channel url '{url}'"
            )));
        }

        // The watch spans the handshake: it holds Connecting while the
        // handshake is in flight and flips to Open only once the transport
        // is up.
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        let transport = match WebSocketTransport::connect(&url).await {
            Ok(transport) => transport,
            Err(err) => {
                surface.set_status(STATUS_ERROR);
                tracing::warn!(target: "spitrig::channel", %url, error = %err, "channel connect failed");
                return Err(err);
            }
        };
        tracing::info!(target: "spitrig::channel", %url, "channel open");

        Ok(Self::open(transport, surface, status_tx, status_rx))
    }

    /// Marks the handshake complete and wires lifecycle events.
    fn open(
        transport: impl ChannelTransport,
        surface: Arc<dyn PanelSurface>,
        status_tx: watch::Sender<ChannelStatus>,
        status_rx: watch::Receiver<ChannelStatus>,
    ) -> Self {
        status_tx.send_replace(ChannelStatus::Open);
        surface.set_status(STATUS_CONNECTED);

        let handle = ChannelHandle {
            frames: transport.frame_sender(),
            status: status_rx,
        };
        let reader_task = tokio::spawn(run_events(transport, status_tx, surface));

        Self {
            handle,
            reader_task: Some(reader_task),
        }
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> ChannelStatus {
        self.handle.status()
    }

    /// Watch handle for status transitions, for UI feedback.
    pub fn status_watch(&self) -> watch::Receiver<ChannelStatus> {
        self.handle.status.clone()
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

/// Consumes transport events until the channel ends.
///
/// Inbound frames are logged and discarded; device-reported state never
/// flows back into the parameter mirror.
async fn run_events(
    mut transport: impl ChannelTransport,
    status_tx: watch::Sender<ChannelStatus>,
    surface: Arc<dyn PanelSurface>,
) {
    while let Some(event) = transport.next_event().await {
        match event {
            ChannelEvent::Frame(bytes) => {
                tracing::debug!(target: "spitrig::channel", len = bytes.len(), "inbound frame");
                tracing::trace!(target: "spitrig::channel", frame = %frame_preview(&bytes), "inbound frame body");
            }
            ChannelEvent::Error(err) => {
                surface.set_status(STATUS_ERROR);
                tracing::warn!(target: "spitrig::channel", error = %err, "channel error");
            }
            ChannelEvent::Closed => break,
        }
    }
    status_tx.send_replace(ChannelStatus::Closed);
    tracing::info!(target: "spitrig::channel", "channel closed");
}
