use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChannelEvent, ChannelTransport};

/// In-memory transport for tests: outbound frames land in a capture queue
/// and lifecycle events are injected from the outside.
pub struct MockTransport {
    frames_tx: mpsc::UnboundedSender<String>,
    events_rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl MockTransport {
    /// Returns the transport plus the capture end for outbound frames and
    /// the injection end for events.
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<ChannelEvent>,
    ) {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                frames_tx,
                events_rx,
            },
            frames_rx,
            events_tx,
        )
    }
}

#[async_trait]
impl ChannelTransport for MockTransport {
    fn frame_sender(&self) -> mpsc::UnboundedSender<String> {
        self.frames_tx.clone()
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events_rx.recv().await
    }
}
