use std::time::Instant;

use anyhow::Context;
use rcall::{Session, SessionConfig};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingData {
	pub endpoint: String,
	pub server: String,
	pub version: String,
	pub protocol: u32,
	/// Transport connect plus handshake
	pub connect_ms: u64,
}

pub async fn run(config: SessionConfig) -> Result<PingData> {
	let endpoint = config.endpoint.to_string();
	let started = Instant::now();

	let session = Session::connect(config)
		.await
		.with_context(|| format!("connecting to {endpoint}"))?;
	let connect_ms = started.elapsed().as_millis() as u64;

	let info = session
		.server_info()
		.context("session is ready but has no server info")?;
	session.close().await;

	Ok(PingData {
		endpoint,
		server: info.server,
		version: info.version,
		protocol: info.protocol,
		connect_ms,
	})
}
