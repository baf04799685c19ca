//! Session handshake.
//!
//! The first request on every connection is [`HANDSHAKE_METHOD`] with a single
//! [`ClientHello`] argument. The server answers with [`ServerInfo`].

use serde::{Deserialize, Serialize};

/// Reserved method name for the handshake request. Not a valid user method.
pub const HANDSHAKE_METHOD: &str = "__handshake__";

/// Protocol revision spoken by this client.
pub const PROTOCOL_VERSION: u32 = 1;

/// Sent by the client as the only handshake argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
	/// Client identifier (shows up in server logs)
	pub client: String,
	/// Client library version
	pub version: String,
	pub protocol: u32,
}

impl ClientHello {
	pub fn new(client: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			client: client.into(),
			version: version.into(),
			protocol: PROTOCOL_VERSION,
		}
	}
}

/// Handshake result describing the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
	/// Server product name
	pub server: String,
	/// Server version string
	#[serde(default)]
	pub version: String,
	pub protocol: u32,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn client_hello_uses_current_protocol() {
		let hello = ClientHello::new("rcall", "1.0.0");
		let json = serde_json::to_value(&hello).unwrap();
		assert_eq!(json["client"], "rcall");
		assert_eq!(json["protocol"], PROTOCOL_VERSION);
	}

	#[test]
	fn server_info_version_is_optional() {
		let info: ServerInfo = serde_json::from_str(r#"{"server": "compute", "protocol": 1}"#).unwrap();
		assert_eq!(info.server, "compute");
		assert!(info.version.is_empty());
	}
}
