//! rcall: session manager for a request/response compute service
//!
//! A [`Session`] owns one logical connection to a remote service and exposes
//! a uniform call surface: a `<namespace>::<function>` method name plus an
//! ordered list of JSON arguments in, one JSON value (or an error) out.
//!
//! # Example
//!
//! ```ignore
//! use rcall::{Endpoint, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> rcall::Result<()> {
//!     // Defaults to tcp://127.0.0.1:8080
//!     let session = rcall::initialize(None).await?;
//!
//!     let hello = session.call("project::helloWorld", vec![]).await?;
//!     println!("{hello}");
//!
//!     let greeting: String = session.call_as("project::greet", ("John", "Doe")).await?;
//!     println!("{greeting}");
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Every failure surfaces as an [`Error`]; [`Error::kind`] sorts it into one
//! of the four [`ErrorKind`]s. Nothing is retried. A failed call leaves the
//! session usable unless the connection itself went away, after which every
//! call fails until a new session is initialized.

pub mod config;
pub mod endpoint;
pub mod session;

pub use config::SessionConfig;
pub use endpoint::{DEFAULT_HOST, DEFAULT_PORT, Endpoint, EndpointError, Scheme};
pub use rcall_protocol::{MethodName, MethodNameError, ServerInfo};
pub use rcall_runtime::{Error, ErrorKind, Result};
pub use serde_json::Value;
pub use session::{Session, SessionState};

/// Connects a session using default settings.
///
/// `None` targets [`Endpoint::default()`] (`tcp://127.0.0.1:8080`).
pub async fn initialize(endpoint: Option<Endpoint>) -> Result<Session> {
	let config = SessionConfig::default().with_endpoint(endpoint.unwrap_or_default());
	Session::connect(config).await
}
