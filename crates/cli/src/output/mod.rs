//! Result envelope and rendering for CLI commands.
//!
//! With `--format json` every command prints one envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "call",
//!   "data": "Hello, John Doe!",
//!   "timings": { "durationMs": 12 }
//! }
//! ```
//!
//! On failure `data` is replaced by
//! `"error": { "code": "INVALID_METHOD", "message": "..." }`.
//! Text format prints just the data, and errors go to stderr.

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use rcall::ErrorKind;
use serde::{Deserialize, Serialize};

/// Bumped on breaking changes to the envelope.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	/// Command name ("call", "ping")
	pub command: String,

	/// Method invoked, for `call`
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	pub message: String,

	/// Remote error name and stack, when the server sent them
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable error codes for scripts consuming JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Endpoint unreachable, connection lost or closed
	ConnectionFailed,
	/// Connect or call did not finish in time
	Timeout,
	/// Malformed or unknown method
	InvalidMethod,
	/// Arguments rejected
	InvalidArgument,
	/// The method failed on the server
	RemoteError,
	InternalError,
}

impl ErrorCode {
	/// Maps a session error kind onto a code.
	pub fn from_kind(kind: ErrorKind, timed_out: bool) -> Self {
		match kind {
			ErrorKind::Connection if timed_out => ErrorCode::Timeout,
			ErrorKind::Connection => ErrorCode::ConnectionFailed,
			ErrorKind::InvalidMethod => ErrorCode::InvalidMethod,
			ErrorKind::Argument => ErrorCode::InvalidArgument,
			ErrorKind::RemoteExecution => ErrorCode::RemoteError,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::ConnectionFailed => write!(f, "CONNECTION_FAILED"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::InvalidMethod => write!(f, "INVALID_METHOD"),
			ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
			ErrorCode::RemoteError => write!(f, "REMOTE_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for [`CommandResult`]; measures duration from `new` to `build`.
pub struct ResultBuilder<T: Serialize> {
	command: String,
	method: Option<String>,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			method: None,
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn method(mut self, method: impl Into<String>) -> Self {
		self.method = Some(method.into());
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok: self.error.is_none(),
			command: self.command,
			method: self.method,
			data: self.data,
			error: self.error,
			timings: Some(self.start_time.elapsed().into()),
		}
	}
}

/// Renders a result for stdout.
pub fn render_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) -> String {
	match format {
		OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
		OutputFormat::Text => match (&result.data, &result.error) {
			(Some(data), _) => render_text(data),
			(None, Some(error)) => format!("Error [{}]: {}", error.code, error.message),
			(None, None) => String::new(),
		},
	}
}

/// Strings print bare, everything else as pretty JSON.
fn render_text<T: Serialize>(data: &T) -> String {
	match serde_json::to_value(data) {
		Ok(serde_json::Value::String(s)) => s,
		Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_default(),
		Err(_) => String::new(),
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	let rendered = render_result(result, format);
	if !rendered.is_empty() {
		println!("{rendered}");
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}
