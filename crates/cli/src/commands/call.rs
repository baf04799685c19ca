use anyhow::Context;
use rcall::{Session, SessionConfig, Value};
use tracing::info;

use crate::args::parse_args;
use crate::cli::CallArgs;
use crate::error::Result;

/// Connects, makes one call and closes the session whatever the outcome.
pub async fn run(config: SessionConfig, args: &CallArgs) -> Result<Value> {
	let call_args = parse_args(&args.args);
	let endpoint = config.endpoint.clone();

	let session = Session::connect(config)
		.await
		.with_context(|| format!("connecting to {endpoint}"))?;

	info!(method = %args.method, argc = call_args.len(), "Calling");
	let result = session
		.call(&args.method, call_args)
		.await
		.with_context(|| format!("calling {}", args.method));

	session.close().await;
	result
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use rcall::Endpoint;

	use super::*;
	use crate::error::to_command_error;
	use crate::output::ErrorCode;

	#[tokio::test]
	async fn unreachable_endpoint_reports_connection_failure() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);

		let config = SessionConfig::new(Endpoint::tcp("127.0.0.1", port)).with_connect_timeout(Duration::from_secs(2));
		let args = CallArgs {
			method: "project::helloWorld".into(),
			args: Vec::new(),
		};

		let err = run(config, &args).await.unwrap_err();
		let cmd = to_command_error(&err);
		assert_eq!(cmd.code, ErrorCode::ConnectionFailed);
		assert!(cmd.message.starts_with(&format!("connecting to tcp://127.0.0.1:{port}")));
	}
}
