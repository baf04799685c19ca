//! Request, response, and error envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error name the server uses for a malformed or unknown method.
pub const INVALID_METHOD_ERROR: &str = "InvalidMethodError";

/// Error name the server uses when it rejects the argument list.
pub const ARGUMENT_ERROR: &str = "ArgumentError";

/// Metadata attached to every outgoing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
	/// Unix timestamp in milliseconds
	#[serde(rename = "wallTime")]
	pub wall_time: i64,
}

impl Metadata {
	/// Create metadata stamped with the current wall-clock time
	pub fn now() -> Self {
		let wall_time = std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|d| d.as_millis() as i64)
			.unwrap_or_default();
		Self { wall_time }
	}
}

/// Call request sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique request ID for correlating responses
	pub id: u32,
	/// `<namespace>::<function>`, passed verbatim
	pub method: String,
	/// Positional arguments
	#[serde(default)]
	pub args: Vec<Value>,
	pub metadata: Metadata,
}

/// Response to a single [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request ID this response correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorWrapper>,
}

impl Response {
	pub fn success(id: u32, result: Value) -> Self {
		Self {
			id,
			result: Some(result),
			error: None,
		}
	}

	pub fn failure(id: u32, name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			id,
			result: None,
			error: Some(ErrorWrapper {
				error: ErrorPayload {
					message: message.into(),
					name: Some(name.into()),
					stack: None,
				},
			}),
		}
	}
}

/// Wrapper for the error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorWrapper {
	pub error: ErrorPayload,
}

/// Server-side error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Error message
	pub message: String,
	/// Error type name (e.g., "InvalidMethodError", "ArgumentError")
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Server-side stack trace
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Any inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}
