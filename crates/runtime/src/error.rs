//! Error types for the rcall runtime.

use rcall_protocol::{ARGUMENT_ERROR, INVALID_METHOD_ERROR, MethodNameError};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification every [`Error`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Transport-level failure: unreachable, reset, closed, or timed out.
	Connection,
	/// Malformed method name, or a method the server does not know.
	InvalidMethod,
	/// Argument list rejected, locally or by the server.
	Argument,
	/// The remote method failed while executing.
	RemoteExecution,
}

/// Errors that can occur in the rcall runtime.
#[derive(Debug, Error)]
pub enum Error {
	/// Failed to establish a connection or complete the handshake.
	#[error("Failed to connect to {endpoint}: {reason}")]
	ConnectionFailed { endpoint: String, reason: String },

	/// The connection was closed by the client.
	#[error("Connection closed")]
	ConnectionClosed,

	/// The connection dropped while the session was in use.
	#[error("Connection lost: {0}")]
	ConnectionLost(String),

	/// Operation not permitted in the session's current state.
	#[error("Cannot {operation} a session in state {state}")]
	InvalidState { operation: &'static str, state: String },

	/// Transport-level error (framing, socket I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Unexpected or undecodable message from the server.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Method name rejected before sending.
	#[error("Invalid method: {0}")]
	InvalidMethod(#[from] MethodNameError),

	/// Argument list rejected before sending.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Error reported by the remote service.
	#[error("{name}: {message}")]
	Remote {
		/// Error type name (e.g., "InvalidMethodError", "ArgumentError")
		name: String,
		/// Human-readable error message
		message: String,
		/// Server-side stack trace (if available)
		stack: Option<String>,
	},

	/// Timeout waiting for an operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Maps this error onto the four-way [`ErrorKind`] taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::ConnectionFailed { .. }
			| Error::ConnectionClosed
			| Error::ConnectionLost(_)
			| Error::InvalidState { .. }
			| Error::TransportError(_)
			| Error::Timeout(_)
			| Error::Io(_) => ErrorKind::Connection,
			Error::InvalidMethod(_) => ErrorKind::InvalidMethod,
			Error::InvalidArgument(_) => ErrorKind::Argument,
			Error::Remote { name, .. } => match name.as_str() {
				INVALID_METHOD_ERROR => ErrorKind::InvalidMethod,
				ARGUMENT_ERROR => ErrorKind::Argument,
				_ => ErrorKind::RemoteExecution,
			},
			Error::ProtocolError(_) | Error::Json(_) => ErrorKind::RemoteExecution,
		}
	}

	/// Returns the error name if this is a Remote error.
	pub fn error_name(&self) -> Option<&str> {
		match self {
			Error::Remote { name, .. } => Some(name),
			_ => None,
		}
	}

	/// Returns the stack trace if this is a Remote error with a stack.
	pub fn stack_trace(&self) -> Option<&str> {
		match self {
			Error::Remote { stack, .. } => stack.as_deref(),
			_ => None,
		}
	}

	/// Returns true for connection-level failures.
	pub fn is_connection(&self) -> bool {
		self.kind() == ErrorKind::Connection
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Returns true when the connection can no longer carry calls.
	///
	/// Timeouts and remote failures leave the connection usable.
	pub fn is_fatal(&self) -> bool {
		matches!(
			self,
			Error::ConnectionClosed | Error::ConnectionLost(_) | Error::TransportError(_) | Error::Io(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn remote(name: &str) -> Error {
		Error::Remote {
			name: name.to_string(),
			message: "boom".to_string(),
			stack: None,
		}
	}

	#[test]
	fn remote_errors_classify_by_name() {
		assert_eq!(remote("InvalidMethodError").kind(), ErrorKind::InvalidMethod);
		assert_eq!(remote("ArgumentError").kind(), ErrorKind::Argument);
		assert_eq!(remote("Error").kind(), ErrorKind::RemoteExecution);
		assert_eq!(remote("TypeError").kind(), ErrorKind::RemoteExecution);
	}

	#[test]
	fn connection_errors_classify_as_connection() {
		assert!(Error::ConnectionClosed.is_connection());
		assert!(Error::ConnectionLost("reset".into()).is_connection());
		assert!(Error::Timeout("call".into()).is_connection());
		assert!(
			Error::InvalidState {
				operation: "call",
				state: "Closed".into()
			}
			.is_connection()
		);
	}

	#[test]
	fn timeouts_are_not_fatal() {
		assert!(!Error::Timeout("call".into()).is_fatal());
		assert!(!remote("Error").is_fatal());
		assert!(Error::ConnectionLost("eof".into()).is_fatal());
	}

	#[test]
	fn local_method_errors_classify_as_invalid_method() {
		let err: Error = rcall_protocol::MethodName::parse("nope").unwrap_err().into();
		assert_eq!(err.kind(), ErrorKind::InvalidMethod);
	}
}
