use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::{ChannelError, ChannelEvent, ChannelTransport};

/// WebSocket implementation of the channel transport.
///
/// Outbound frames are pumped through an unbounded queue so callers never
/// block; inbound traffic surfaces as [`ChannelEvent`]s. Inbound binary
/// frames arrive as raw buffers, matching the device's negotiated frame
/// mode.
pub struct WebSocketTransport {
    tx: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    ws_task: Option<tokio::task::JoinHandle<()>>,
}

impl WebSocketTransport {
    /// Opens the WebSocket and starts the pump task.
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;

        let (tx_out, rx_out) = mpsc::unbounded_channel::<String>();
        let (tx_event, rx_event) = mpsc::unbounded_channel::<ChannelEvent>();

        let ws_task = tokio::spawn(async move {
            pump_websocket(ws_stream, rx_out, tx_event).await;
        });

        Ok(Self {
            tx: tx_out,
            events: rx_event,
            ws_task: Some(ws_task),
        })
    }
}

#[async_trait]
impl ChannelTransport for WebSocketTransport {
    fn frame_sender(&self) -> mpsc::UnboundedSender<String> {
        self.tx.clone()
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }
}

/// Shuttles frames between the socket and the transport's queues until
/// either peer ends the connection.
async fn pump_websocket(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut rx_out: mpsc::UnboundedReceiver<String>,
    tx_event: mpsc::UnboundedSender<ChannelEvent>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Forward queued frames to the socket as text messages
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx_out.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if tx_event.send(ChannelEvent::Frame(text.into_bytes())).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(data)) => {
                if tx_event.send(ChannelEvent::Frame(data)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(err) => {
                let _ = tx_event.send(ChannelEvent::Error(err.to_string()));
                break;
            }
            _ => {} // Ignore Ping/Pong/Frame
        }
    }

    let _ = tx_event.send(ChannelEvent::Closed);

    send_task.abort();
    let _ = send_task.await;
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.ws_task.take() {
            task.abort();
        }
    }
}
