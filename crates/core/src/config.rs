use std::time::Duration;

use crate::endpoint::Endpoint;

/// Upper bound for transport connect plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a single call unless overridden.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `close` waits for the I/O loop to wind down.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fully owned session configuration.
///
/// The default endpoint lives here rather than in any global, so two sessions
/// built from the same config always target the same service.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Remote service address.
	pub endpoint: Endpoint,
	/// Bound on transport connect plus handshake.
	pub connect_timeout: Duration,
	/// Per-call bound; `None` waits indefinitely.
	pub call_timeout: Option<Duration>,
	/// Bound on graceful shutdown in `close`.
	pub close_timeout: Duration,
	/// Name announced in the handshake.
	pub client_name: String,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self::new(Endpoint::default())
	}
}

impl SessionConfig {
	pub fn new(endpoint: Endpoint) -> Self {
		Self {
			endpoint,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			call_timeout: Some(DEFAULT_CALL_TIMEOUT),
			close_timeout: DEFAULT_CLOSE_TIMEOUT,
			client_name: env!("CARGO_PKG_NAME").to_string(),
		}
	}

	pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
		self.endpoint = endpoint;
		self
	}

	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.call_timeout = timeout;
		self
	}

	pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
		self.close_timeout = timeout;
		self
	}

	pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
		self.client_name = name.into();
		self
	}
}
