//! WebSocket transport.

use super::{Transport, TransportParts, TransportReceiver};
use crate::error::{Error, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-over-WebSocket transport (`ws://` and `wss://` endpoints).
pub struct WebSocketTransport {
	sink: SplitSink<WsStream, WsMessage>,
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl WebSocketTransport {
	/// Opens a WebSocket connection to `url`.
	pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
		let (ws, response) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::TransportError(format!("WebSocket connect to {} failed: {}", url, e)))?;
		tracing::debug!(%url, status = %response.status(), "WebSocket connected");

		let (sink, stream) = ws.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		Ok((
			Self {
				sink,
				stream,
				message_tx,
			},
			message_rx,
		))
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		TransportParts {
			sender: Box::new(WebSocketSender { sink: self.sink }),
			receiver: Box::new(WebSocketReceiver {
				stream: self.stream,
				message_tx: self.message_tx,
			}),
			message_rx,
		}
	}
}

/// Write half of a [`WebSocketTransport`].
pub struct WebSocketSender {
	sink: SplitSink<WsStream, WsMessage>,
}

impl Transport for WebSocketSender {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(format!("WebSocket send failed: {}", e)))
		})
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			self.sink
				.close()
				.await
				.map_err(|e| Error::TransportError(format!("WebSocket close failed: {}", e)))
		})
	}
}

/// Read half of a [`WebSocketTransport`].
pub struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for WebSocketReceiver {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			while let Some(frame) = self.stream.next().await {
				let frame = frame.map_err(|e| Error::TransportError(format!("WebSocket read failed: {}", e)))?;
				let parsed = match frame {
					WsMessage::Text(text) => serde_json::from_str::<Value>(&text),
					WsMessage::Binary(bytes) => serde_json::from_slice::<Value>(&bytes),
					WsMessage::Close(reason) => {
						tracing::debug!(?reason, "WebSocket closed by peer");
						return Ok(());
					}
					_ => continue,
				};

				match parsed {
					Ok(message) => {
						if self.message_tx.send(message).is_err() {
							tracing::debug!("Inbound channel closed, stopping WebSocket reader");
							return Ok(());
						}
					}
					Err(e) => tracing::error!("Dropping undecodable WebSocket message: {}", e),
				}
			}
			Ok(())
		})
	}
}
