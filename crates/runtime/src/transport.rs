//! Transport layer
//!
//! Moves JSON messages between the client and the remote service. Two
//! transports are provided:
//!
//! - [`FramedTransport`]: length-prefixed frames over any byte stream (TCP in
//!   production, `tokio::io::duplex` in tests). Each frame is a 4-byte
//!   little-endian length followed by that many bytes of JSON.
//! - [`WebSocketTransport`]: one JSON document per WebSocket message.
//!
//! Both split into a [`Transport`] (write side) and a [`TransportReceiver`]
//! (read side) so the connection can drive them from separate tasks.

use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

mod websocket;

pub use websocket::{WebSocketReceiver, WebSocketSender, WebSocketTransport};

/// Frames larger than this are rejected instead of allocated.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Write half of a transport.
pub trait Transport: Send {
	/// Sends one JSON message.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

	/// Gracefully closes the write side.
	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Read half of a transport.
///
/// `run` forwards every decoded message into the inbound channel until the
/// stream ends, fails, or the channel is dropped.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// A transport split into the pieces a [`Connection`](crate::Connection) owns.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-prefixed JSON transport over an arbitrary byte stream.
pub struct FramedTransport<W, R> {
	writer: W,
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

/// TCP flavour of [`FramedTransport`].
pub type TcpTransport = FramedTransport<OwnedWriteHalf, OwnedReadHalf>;

impl<W, R> FramedTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport and the receiver for inbound messages.
	pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer,
				reader,
				message_tx,
			},
			message_rx,
		)
	}

	/// Writes one frame.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.writer, &message).await
	}

	/// Reads frames until the stream fails or the inbound channel is dropped.
	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.reader, &self.message_tx).await
	}

	/// Splits into independently owned write and read halves.
	pub fn into_parts(self) -> (FramedSender<W>, FramedReceiver<R>) {
		(
			FramedSender { writer: self.writer },
			FramedReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

impl TcpTransport {
	/// Connects to `addr` (`host:port`) and wraps the stream.
	pub async fn connect(addr: &str) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
		let stream = TcpStream::connect(addr).await?;
		Self::from_stream(stream)
	}

	pub fn from_stream(stream: TcpStream) -> Result<(Self, mpsc::UnboundedReceiver<Value>)> {
		stream.set_nodelay(true)?;
		let (read_half, write_half) = stream.into_split();
		Ok(Self::new(write_half, read_half))
	}
}

/// Write half of a [`FramedTransport`].
pub struct FramedSender<W> {
	writer: W,
}

impl<W: AsyncWrite + Unpin + Send> FramedSender<W> {
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.writer, &message).await
	}
}

impl<W: AsyncWrite + Unpin + Send> Transport for FramedSender<W> {
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { write_frame(&mut self.writer, &message).await })
	}

	fn close(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			self.writer
				.shutdown()
				.await
				.map_err(|e| Error::TransportError(format!("Failed to shut down writer: {}", e)))
		})
	}
}

/// Read half of a [`FramedTransport`].
pub struct FramedReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R: AsyncRead + Unpin + Send + 'static> TransportReceiver for FramedReceiver<R> {
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move { read_loop(&mut self.reader, &self.message_tx).await })
	}
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
	let json_bytes = serde_json::to_vec(message)?;
	if json_bytes.len() > MAX_FRAME_SIZE {
		return Err(Error::TransportError(format!(
			"Outgoing frame of {} bytes exceeds limit of {}",
			json_bytes.len(),
			MAX_FRAME_SIZE
		)));
	}
	let length = json_bytes.len() as u32;

	let mut frame = Vec::with_capacity(4 + json_bytes.len());
	frame.extend_from_slice(&length.to_le_bytes());
	frame.extend_from_slice(&json_bytes);

	writer
		.write_all(&frame)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to write frame: {}", e)))?;
	writer
		.flush()
		.await
		.map_err(|e| Error::TransportError(format!("Failed to flush frame: {}", e)))?;
	Ok(())
}

async fn read_loop<R: AsyncRead + Unpin>(reader: &mut R, message_tx: &mpsc::UnboundedSender<Value>) -> Result<()> {
	loop {
		let mut len_buf = [0u8; 4];
		reader
			.read_exact(&mut len_buf)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {}", e)))?;
		let length = u32::from_le_bytes(len_buf) as usize;

		if length > MAX_FRAME_SIZE {
			return Err(Error::TransportError(format!(
				"Incoming frame of {} bytes exceeds limit of {}",
				length, MAX_FRAME_SIZE
			)));
		}

		let mut payload = vec![0u8; length];
		reader
			.read_exact(&mut payload)
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read frame body: {}", e)))?;

		let message: Value = match serde_json::from_slice(&payload) {
			Ok(value) => value,
			Err(e) => {
				tracing::error!("Dropping undecodable frame ({} bytes): {}", length, e);
				continue;
			}
		};

		if message_tx.send(message).is_err() {
			tracing::debug!("Inbound channel closed, stopping transport reader");
			return Ok(());
		}
	}
}
