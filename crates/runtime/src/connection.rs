//! Request/response correlation layer
//!
//! This module sits on top of a transport and turns it into a call surface:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Failing pending requests when the connection goes away
//!
//! # Message Flow
//!
//! 1. Caller invokes `send_message()` with a method name and arguments
//! 2. Connection generates a unique ID and parks a oneshot sender under it
//! 3. Request is serialized and queued for the writer task
//! 4. Caller awaits the oneshot receiver
//! 5. The dispatch loop receives the response from the reader task
//! 6. Response is matched by ID and delivered through the oneshot
//! 7. Caller receives the result
//!
//! Responses can arrive in any order; only the ID decides who gets what.

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};
use parking_lot::Mutex;
use rcall_protocol::{ErrorPayload, Message, Metadata, Request};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// Why the connection stopped accepting calls.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CloseReason {
	Closed,
	Lost(String),
}

impl CloseReason {
	fn to_error(&self) -> Error {
		match self {
			CloseReason::Closed => Error::ConnectionClosed,
			CloseReason::Lost(reason) => Error::ConnectionLost(reason.clone()),
		}
	}
}

/// RAII guard ensuring callback cleanup when a request future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		if self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "CancelGuard: removed abandoned callback");
		}
	}
}

/// Future returned by [`Connection::send_message`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(
					result
						.map_err(|_| Error::ConnectionLost("response channel dropped".to_string()))
						.and_then(|r| r),
				)
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Transport pieces consumed by [`Connection::run`].
struct IoParts {
	sender: Box<dyn Transport>,
	receiver: Box<dyn TransportReceiver>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// Request/response connection to a remote compute service.
///
/// Uses sequential request IDs and oneshot channels for correlation. Any
/// number of calls may be in flight at once.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending request callbacks keyed by request ID
	callbacks: CallbackMap,
	/// Channel for sending outbound messages to the writer task (taken on close)
	outbound_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
	/// Transport halves and channels (taken by run())
	io: Mutex<Option<IoParts>>,
	closed: AtomicBool,
	close_reason: Mutex<Option<CloseReason>>,
}

impl Connection {
	/// Create a new Connection with the given transport
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx: Mutex::new(Some(outbound_tx)),
			io: Mutex::new(Some(IoParts {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
			closed: AtomicBool::new(false),
			close_reason: Mutex::new(None),
		}
	}

	/// Creates a connection and spawns its dispatch loop.
	pub fn start(parts: TransportParts) -> (Arc<Self>, JoinHandle<()>) {
		let connection = Arc::new(Self::new(parts));
		let conn_for_loop = Arc::clone(&connection);
		let handle = tokio::spawn(async move {
			conn_for_loop.run().await;
		});
		(connection, handle)
	}

	/// Sends a call to the server and awaits the correlated response.
	///
	/// Dropping the returned future abandons the call: its slot in the
	/// pending table is released and a late response is ignored.
	pub async fn send_message(&self, method: &str, args: Vec<Value>) -> Result<Value> {
		if let Some(err) = self.closed_error() {
			return Err(err);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);

		tracing::debug!("Sending message: id={}, method='{}', args={}", id, method, args.len());

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);

		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		let request = Request {
			id,
			method: method.to_string(),
			args,
			metadata: Metadata::now(),
		};

		let request_value = serde_json::to_value(&request)?;
		tracing::trace!("Request JSON: {}", request_value);

		let queued = match self.outbound_tx.lock().as_ref() {
			Some(outbound_tx) => outbound_tx.send(request_value).is_ok(),
			None => false,
		};
		if !queued {
			tracing::debug!(id, "Failed to queue message: outbound channel closed");
			return Err(self.closed_error().unwrap_or(Error::ConnectionClosed));
		}

		ResponseFuture { rx, guard }.await
	}

	/// Stops accepting calls and fails everything still pending.
	///
	/// The writer task drains what is already queued, then closes the
	/// transport. Calling this more than once is a no-op.
	pub fn close(&self) {
		self.mark_closed(CloseReason::Closed);
	}

	/// True once the connection was closed or lost.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Number of calls awaiting a response.
	pub fn pending_count(&self) -> usize {
		self.callbacks.lock().len()
	}

	/// The error a call on this connection would fail with, if it is no longer usable.
	pub fn closed_error(&self) -> Option<Error> {
		if !self.is_closed() {
			return None;
		}
		Some(
			self.close_reason
				.lock()
				.as_ref()
				.map(CloseReason::to_error)
				.unwrap_or(Error::ConnectionClosed),
		)
	}

	/// Run the message dispatch loop until the connection closes or drops.
	pub async fn run(self: &Arc<Self>) {
		let Some(io) = self.io.lock().take() else {
			tracing::error!("Connection::run called more than once");
			return;
		};
		let IoParts {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		} = io;

		let mut reader_handle = tokio::spawn(async move { receiver.run().await });

		let mut writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				sender.send(message).await?;
			}
			if let Err(e) = sender.close().await {
				tracing::debug!("Transport close failed: {}", e);
			}
			Ok::<(), Error>(())
		});

		let reason = loop {
			tokio::select! {
				message = message_rx.recv() => match message {
					Some(message_value) => self.handle_incoming(message_value),
					None => {
						let reason = match (&mut reader_handle).await {
							Ok(Ok(())) => "server closed the connection".to_string(),
							Ok(Err(e)) => e.to_string(),
							Err(e) => format!("reader task failed: {}", e),
						};
						break CloseReason::Lost(reason);
					}
				},
				written = &mut writer_handle => {
					break match written {
						Ok(Ok(())) => CloseReason::Closed,
						Ok(Err(e)) => {
							tracing::error!("Transport write error: {}", e);
							CloseReason::Lost(e.to_string())
						}
						Err(e) => CloseReason::Lost(format!("writer task failed: {}", e)),
					};
				}
			}
		};

		if let CloseReason::Lost(detail) = &reason {
			tracing::warn!("Connection lost: {}", detail);
		}
		self.mark_closed(reason);
		reader_handle.abort();
	}

	fn handle_incoming(&self, message_value: Value) {
		match serde_json::from_value::<Message>(message_value) {
			Ok(message) => self.dispatch_internal(message),
			Err(e) => tracing::error!("Failed to parse message: {}", e),
		}
	}

	/// Dispatch an incoming message (test-only public version)
	#[cfg(test)]
	pub fn dispatch(&self, message: Message) {
		self.dispatch_internal(message)
	}

	fn dispatch_internal(&self, message: Message) {
		match message {
			Message::Response(response) => {
				tracing::debug!("Processing response for ID: {}", response.id);
				let Some(callback) = self.callbacks.lock().remove(&response.id) else {
					tracing::debug!(id = response.id, "Response for unknown or abandoned request (ignored)");
					return;
				};

				let result = if let Some(error_wrapper) = response.error {
					Err(parse_protocol_error(error_wrapper.error))
				} else {
					Ok(response.result.unwrap_or(Value::Null))
				};

				let _ = callback.send(result);
			}
			Message::Unknown(value) => {
				// A pending id with an undecodable body must still complete its call
				let pending = response_id(&value).and_then(|id| self.callbacks.lock().remove(&id).map(|cb| (id, cb)));
				match pending {
					Some((id, callback)) => {
						tracing::error!(id, "Malformed response: {}", value);
						let _ = callback.send(Err(Error::ProtocolError(format!(
							"malformed response for request {}: {}",
							id, value
						))));
					}
					None => tracing::debug!(
						"Unknown message type (forward-compatible, ignored): {}",
						serde_json::to_string(&value).unwrap_or_else(|_| "<serialization failed>".to_string())
					),
				}
			}
		}
	}

	fn mark_closed(&self, reason: CloseReason) {
		{
			let mut slot = self.close_reason.lock();
			if slot.is_none() {
				*slot = Some(reason);
			}
		}
		self.closed.store(true, Ordering::SeqCst);
		self.outbound_tx.lock().take();

		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		if pending.is_empty() {
			return;
		}
		let error_reason = self.close_reason.lock().clone().unwrap_or(CloseReason::Closed);
		tracing::debug!("Failing {} pending call(s): {:?}", pending.len(), error_reason);
		for (_, callback) in pending {
			let _ = callback.send(Err(error_reason.to_error()));
		}
	}
}

fn response_id(value: &Value) -> Option<u32> {
	value.get("id").and_then(Value::as_u64).and_then(|id| u32::try_from(id).ok())
}

/// Converts an [`ErrorPayload`] from the server into [`Error::Remote`].
fn parse_protocol_error(error: ErrorPayload) -> Error {
	Error::Remote {
		name: error.name.unwrap_or_else(|| "Error".to_string()),
		message: error.message,
		stack: error.stack,
	}
}
