//! [`Session`]: one logical connection to a remote compute service.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rcall_protocol::{ClientHello, HANDSHAKE_METHOD, MethodName, PROTOCOL_VERSION, ServerInfo};
use rcall_runtime::{Connection, Error, Result, TcpTransport, TransportParts, WebSocketTransport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::endpoint::{Endpoint, Scheme};

/// Lifecycle of a [`Session`].
///
/// ```text
/// Uninitialized -> Connecting -> Ready -> Closed
///                      |           |
///                      +-> Failed <+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Uninitialized,
	Connecting,
	Ready,
	Closed,
	/// Initialization failed or the connection was lost. Terminal.
	Failed,
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			SessionState::Uninitialized => "Uninitialized",
			SessionState::Connecting => "Connecting",
			SessionState::Ready => "Ready",
			SessionState::Closed => "Closed",
			SessionState::Failed => "Failed",
		};
		f.write_str(name)
	}
}

/// A live connection handle used to issue calls.
///
/// A session is owned by whoever created it. Calls take `&self`, so several
/// calls can be in flight at once (join them, or share the session behind an
/// `Arc` to use it from spawned tasks); responses are matched back to their
/// callers by request ID.
///
/// Call [`close`](Self::close) when done. Dropping a session that is still
/// open closes its connection as well, without waiting for the shutdown.
///
/// # Example
///
/// ```ignore
/// let session = rcall::initialize(None).await?;
/// let greeting = session.call("project::greet", vec!["John".into(), "Doe".into()]).await?;
/// session.close().await;
/// ```
pub struct Session {
	config: SessionConfig,
	state: Mutex<SessionState>,
	connection: Mutex<Option<Arc<Connection>>>,
	run_loop: Mutex<Option<JoinHandle<()>>>,
	server_info: Mutex<Option<ServerInfo>>,
}

impl Session {
	/// Creates an uninitialized session. Nothing is connected until
	/// [`initialize`](Self::initialize) is awaited.
	pub fn new(config: SessionConfig) -> Self {
		Self {
			config,
			state: Mutex::new(SessionState::Uninitialized),
			connection: Mutex::new(None),
			run_loop: Mutex::new(None),
			server_info: Mutex::new(None),
		}
	}

	/// Creates a session and connects it.
	///
	/// # Errors
	///
	/// Returns a connection-kind error if the endpoint is unreachable, the
	/// handshake is rejected, or either does not finish within
	/// `connect_timeout`.
	pub async fn connect(config: SessionConfig) -> Result<Self> {
		let session = Self::new(config);
		session.initialize().await?;
		Ok(session)
	}

	/// Connects the transport and performs the handshake.
	///
	/// Moves the session from `Uninitialized` through `Connecting` to `Ready`,
	/// or to `Failed` if anything goes wrong, including the returned future
	/// being dropped. A failed session cannot be initialized again; create a
	/// new one. A concurrent [`close`](Self::close) wins: this returns
	/// [`Error::ConnectionClosed`] and the session stays `Closed`.
	pub async fn initialize(&self) -> Result<()> {
		{
			let mut state = self.state.lock();
			if *state != SessionState::Uninitialized {
				return Err(Error::InvalidState {
					operation: "initialize",
					state: state.to_string(),
				});
			}
			*state = SessionState::Connecting;
		}

		let pending = PendingInit {
			session: self,
			committed: false,
		};

		let result = match self.establish().await {
			Ok(info) => pending.commit(info),
			Err(e) => Err(e),
		};

		match &result {
			Ok(()) => {
				if let Some(info) = self.server_info() {
					tracing::info!(
						endpoint = %self.config.endpoint,
						server = %info.server,
						version = %info.version,
						"Session ready"
					);
				}
			}
			Err(e) => tracing::debug!(endpoint = %self.config.endpoint, "Session initialization failed: {}", e),
		}
		result
	}

	async fn establish(&self) -> Result<ServerInfo> {
		let endpoint = &self.config.endpoint;
		let timeout = self.config.connect_timeout;
		let deadline = Instant::now() + timeout;

		tracing::debug!(%endpoint, "Connecting");
		let parts = match tokio::time::timeout_at(deadline, open_transport(endpoint)).await {
			Ok(Ok(parts)) => parts,
			Ok(Err(e)) => return Err(connection_failed(endpoint, e)),
			Err(_) => return Err(connect_timeout(endpoint, timeout)),
		};

		let (connection, run_loop) = Connection::start(parts);
		self.attach(Arc::clone(&connection), run_loop)?;

		let hello = handshake(&connection, &self.config.client_name);
		match tokio::time::timeout_at(deadline, hello).await {
			Ok(Ok(info)) => Ok(info),
			Ok(Err(_)) if *self.state.lock() == SessionState::Closed => Err(Error::ConnectionClosed),
			Ok(Err(e)) => Err(connection_failed(endpoint, e)),
			Err(_) => Err(connect_timeout(endpoint, timeout)),
		}
	}

	/// Parks a connection that is still handshaking, so `close` can reach it.
	fn attach(&self, connection: Arc<Connection>, run_loop: JoinHandle<()>) -> Result<()> {
		let state = self.state.lock();
		if *state != SessionState::Connecting {
			connection.close();
			return Err(Error::ConnectionClosed);
		}
		*self.connection.lock() = Some(connection);
		*self.run_loop.lock() = Some(run_loop);
		Ok(())
	}

	/// Invokes `method` with positional `args` and waits for its result.
	///
	/// Bounded by the configured `call_timeout`. The call is sent at most
	/// once; nothing is retried.
	///
	/// # Errors
	///
	/// - [`ErrorKind::InvalidMethod`](crate::ErrorKind::InvalidMethod): malformed name (checked before
	///   sending) or unknown to the server
	/// - [`ErrorKind::Argument`](crate::ErrorKind::Argument): arguments rejected by the server
	/// - [`ErrorKind::RemoteExecution`](crate::ErrorKind::RemoteExecution): the method failed on the server
	/// - [`ErrorKind::Connection`](crate::ErrorKind::Connection): session not ready, connection lost, or timeout
	pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
		self.call_inner(method, args, self.config.call_timeout).await
	}

	/// Like [`call`](Self::call) with an explicit timeout for this call only.
	pub async fn call_with_timeout(&self, method: &str, args: Vec<Value>, timeout: Duration) -> Result<Value> {
		self.call_inner(method, args, Some(timeout)).await
	}

	/// Typed variant of [`call`](Self::call).
	///
	/// `args` must serialize to a JSON array (a tuple, slice or `Vec`); `()`
	/// means no arguments. The result is deserialized into `R`.
	pub async fn call_as<A, R>(&self, method: &str, args: A) -> Result<R>
	where
		A: Serialize,
		R: DeserializeOwned,
	{
		let args = match serde_json::to_value(args).map_err(|e| Error::InvalidArgument(e.to_string()))? {
			Value::Array(items) => items,
			Value::Null => Vec::new(),
			other => {
				return Err(Error::InvalidArgument(format!(
					"arguments must serialize to a list, got {}",
					json_type(&other)
				)));
			}
		};

		let value = self.call(method, args).await?;
		serde_json::from_value(value).map_err(|e| Error::ProtocolError(format!("cannot decode result of {}: {}", method, e)))
	}

	async fn call_inner(&self, method: &str, args: Vec<Value>, timeout: Option<Duration>) -> Result<Value> {
		let method = MethodName::parse(method)?;
		let connection = self.ready_connection("call")?;

		let call = connection.send_message(method.as_str(), args);
		let result = match timeout {
			Some(limit) => match tokio::time::timeout(limit, call).await {
				Ok(result) => result,
				Err(_) => {
					tracing::debug!(%method, ?limit, "Call timed out");
					Err(Error::Timeout(format!("{} did not respond within {:?}", method, limit)))
				}
			},
			None => call.await,
		};

		if matches!(&result, Err(e) if e.is_fatal()) {
			self.mark_failed();
		}
		result
	}

	/// Returns the live connection, or the error a call should fail with.
	fn ready_connection(&self, operation: &'static str) -> Result<Arc<Connection>> {
		let state = *self.state.lock();
		if state != SessionState::Ready {
			return Err(Error::InvalidState {
				operation,
				state: state.to_string(),
			});
		}

		let connection = self.connection.lock().clone().ok_or(Error::ConnectionClosed)?;
		if let Some(err) = connection.closed_error() {
			self.mark_failed();
			return Err(err);
		}
		Ok(connection)
	}

	fn mark_failed(&self) {
		let mut state = self.state.lock();
		if *state == SessionState::Ready {
			tracing::warn!(endpoint = %self.config.endpoint, "Session connection lost");
			*state = SessionState::Failed;
		}
	}

	/// Releases the connection.
	///
	/// In-flight calls fail with [`Error::ConnectionClosed`]. Closing an
	/// already closed session does nothing.
	pub async fn close(&self) {
		let previous = {
			let mut state = self.state.lock();
			let previous = *state;
			if previous == SessionState::Closed {
				return;
			}
			*state = SessionState::Closed;
			previous
		};

		let connection = self.connection.lock().take();
		let run_loop = self.run_loop.lock().take();

		if let Some(connection) = connection {
			connection.close();
		}

		if let Some(handle) = run_loop {
			let abort = handle.abort_handle();
			if tokio::time::timeout(self.config.close_timeout, handle).await.is_err() {
				tracing::warn!(
					endpoint = %self.config.endpoint,
					"Connection did not shut down within {:?}, aborting",
					self.config.close_timeout
				);
				abort.abort();
			}
		}

		tracing::debug!(endpoint = %self.config.endpoint, from = %previous, "Session closed");
	}

	/// Current lifecycle state. A lost connection reports `Failed`.
	pub fn state(&self) -> SessionState {
		let state = *self.state.lock();
		if state == SessionState::Ready && self.connection.lock().as_ref().is_some_and(|c| c.is_closed()) {
			self.mark_failed();
			return SessionState::Failed;
		}
		state
	}

	pub fn is_ready(&self) -> bool {
		self.state() == SessionState::Ready
	}

	pub fn endpoint(&self) -> &Endpoint {
		&self.config.endpoint
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// What the server reported during the handshake.
	pub fn server_info(&self) -> Option<ServerInfo> {
		self.server_info.lock().clone()
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		if let Some(connection) = self.connection.get_mut().take() {
			tracing::debug!(endpoint = %self.config.endpoint, "Session dropped while open, closing connection");
			connection.close();
		}
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("endpoint", &self.config.endpoint)
			.field("state", &*self.state.lock())
			.finish_non_exhaustive()
	}
}

/// Rolls back an `initialize` that failed or whose future was dropped.
///
/// Unless committed, the session ends `Failed` and a connection started for
/// it is closed. A `close` that got there first wins.
struct PendingInit<'a> {
	session: &'a Session,
	committed: bool,
}

impl PendingInit<'_> {
	fn commit(mut self, info: ServerInfo) -> Result<()> {
		let session = self.session;
		let mut state = session.state.lock();
		if *state != SessionState::Connecting {
			return Err(Error::ConnectionClosed);
		}
		*session.server_info.lock() = Some(info);
		*state = SessionState::Ready;
		self.committed = true;
		Ok(())
	}
}

impl Drop for PendingInit<'_> {
	fn drop(&mut self) {
		if self.committed {
			return;
		}
		{
			let mut state = self.session.state.lock();
			if *state != SessionState::Connecting {
				return;
			}
			*state = SessionState::Failed;
		}
		if let Some(connection) = self.session.connection.lock().take() {
			connection.close();
		}
		self.session.run_loop.lock().take();
	}
}

async fn open_transport(endpoint: &Endpoint) -> Result<TransportParts> {
	match endpoint.scheme() {
		Scheme::Tcp => {
			let (transport, message_rx) = TcpTransport::connect(&endpoint.socket_addr()).await?;
			Ok(transport.into_transport_parts(message_rx))
		}
		Scheme::Ws | Scheme::Wss => {
			let (transport, message_rx) = WebSocketTransport::connect(&endpoint.to_string()).await?;
			Ok(transport.into_transport_parts(message_rx))
		}
	}
}

async fn handshake(connection: &Connection, client_name: &str) -> Result<ServerInfo> {
	let hello = ClientHello::new(client_name, env!("CARGO_PKG_VERSION"));
	let response = connection.send_message(HANDSHAKE_METHOD, vec![serde_json::to_value(hello)?]).await?;

	let info: ServerInfo =
		serde_json::from_value(response).map_err(|e| Error::ProtocolError(format!("invalid handshake response: {}", e)))?;

	if info.protocol != PROTOCOL_VERSION {
		return Err(Error::ProtocolError(format!(
			"server speaks protocol {}, client speaks {}",
			info.protocol, PROTOCOL_VERSION
		)));
	}
	Ok(info)
}

fn connection_failed(endpoint: &Endpoint, err: Error) -> Error {
	Error::ConnectionFailed {
		endpoint: endpoint.to_string(),
		reason: err.to_string(),
	}
}

fn connect_timeout(endpoint: &Endpoint, timeout: Duration) -> Error {
	Error::Timeout(format!("connecting to {} did not complete within {:?}", endpoint, timeout))
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
