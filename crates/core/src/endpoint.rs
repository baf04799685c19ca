//! Network address of the remote compute service.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Host used when no endpoint is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port used when no endpoint is given, or a `tcp://` endpoint omits it.
pub const DEFAULT_PORT: u16 = 8080;

/// Wire transport selected by the endpoint's scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
	/// Length-prefixed JSON frames over plain TCP.
	Tcp,
	/// JSON over WebSocket.
	Ws,
	/// JSON over WebSocket with TLS.
	Wss,
}

impl Scheme {
	pub fn as_str(self) -> &'static str {
		match self {
			Scheme::Tcp => "tcp",
			Scheme::Ws => "ws",
			Scheme::Wss => "wss",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
	#[error("invalid endpoint '{input}': {source}")]
	InvalidUrl {
		input: String,
		#[source]
		source: url::ParseError,
	},

	#[error("unsupported endpoint scheme '{0}' (expected tcp, http, ws or wss)")]
	UnsupportedScheme(String),

	#[error("endpoint '{0}' has no host")]
	MissingHost(String),
}

/// Where a session connects to.
///
/// Parsed from strings like `tcp://127.0.0.1:8080`, `ws://host:9000/rpc` or a
/// bare `host:port`. `http://` is read as `tcp://`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
	scheme: Scheme,
	host: String,
	port: u16,
	/// Request path (WebSocket only), always starting with `/`
	path: String,
}

impl Default for Endpoint {
	fn default() -> Self {
		Self::tcp(DEFAULT_HOST, DEFAULT_PORT)
	}
}

impl Endpoint {
	/// Plain TCP endpoint.
	pub fn tcp(host: impl Into<String>, port: u16) -> Self {
		Self {
			scheme: Scheme::Tcp,
			host: host.into(),
			port,
			path: "/".to_string(),
		}
	}

	/// WebSocket endpoint at `path`.
	pub fn ws(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
		let path = path.into();
		let path = if path.starts_with('/') { path } else { format!("/{path}") };
		Self {
			scheme: Scheme::Ws,
			host: host.into(),
			port,
			path,
		}
	}

	pub fn parse(input: &str) -> Result<Self, EndpointError> {
		let normalized = match input.split_once("://") {
			Some(("http", rest)) => format!("tcp://{rest}"),
			Some(_) => input.to_string(),
			None => format!("tcp://{input}"),
		};

		let url = Url::parse(&normalized).map_err(|source| EndpointError::InvalidUrl {
			input: input.to_string(),
			source,
		})?;

		let scheme = match url.scheme() {
			"tcp" => Scheme::Tcp,
			"ws" => Scheme::Ws,
			"wss" => Scheme::Wss,
			other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
		};

		let host = match url.host_str() {
			Some(host) if !host.is_empty() => host.to_string(),
			_ => return Err(EndpointError::MissingHost(input.to_string())),
		};

		// ws/wss fall back to their standard ports, tcp has no registered default
		let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

		let path = match (scheme, url.query()) {
			(Scheme::Tcp, _) => "/".to_string(),
			(_, Some(query)) => format!("{}?{}", url.path(), query),
			(_, None) => url.path().to_string(),
		};

		Ok(Self {
			scheme,
			host,
			port,
			path: if path.is_empty() { "/".to_string() } else { path },
		})
	}

	pub fn scheme(&self) -> Scheme {
		self.scheme
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// `host:port`, suitable for `TcpStream::connect`.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// True when the host is a loopback name or address.
	pub fn is_loopback(&self) -> bool {
		match self.host.trim_start_matches('[').trim_end_matches(']').parse::<std::net::IpAddr>() {
			Ok(ip) => ip.is_loopback(),
			Err(_) => self.host.eq_ignore_ascii_case("localhost"),
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.scheme {
			Scheme::Tcp => write!(f, "tcp://{}:{}", self.host, self.port),
			Scheme::Ws | Scheme::Wss => write!(f, "{}://{}:{}{}", self.scheme.as_str(), self.host, self.port, self.path),
		}
	}
}

impl FromStr for Endpoint {
	type Err = EndpointError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
