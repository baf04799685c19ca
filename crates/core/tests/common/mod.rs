//! In-process compute server for integration tests.
//!
//! Speaks the rcall wire protocol over TCP frames or WebSocket and serves a
//! small `project::*` namespace.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rcall::Endpoint;
use rcall_protocol::{ARGUMENT_ERROR, HANDSHAKE_METHOD, INVALID_METHOD_ERROR, PROTOCOL_VERSION, Request, Response, ServerInfo};
use rcall_runtime::{TcpTransport, Transport, TransportReceiver};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
	Tcp,
	WebSocket,
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
	pub wire: Wire,
	/// When false the handshake is never answered.
	pub answer_handshake: bool,
	pub protocol: u32,
}

impl Default for ServerOptions {
	fn default() -> Self {
		Self {
			wire: Wire::Tcp,
			answer_handshake: true,
			protocol: PROTOCOL_VERSION,
		}
	}
}

enum Reply {
	Now(Response),
	After(Duration, Response),
	Never,
	/// Drop the connection without answering.
	Crash,
}

struct ComputeState {
	options: ServerOptions,
	people: Mutex<Vec<String>>,
	active: AtomicUsize,
}

pub struct MockServer {
	addr: SocketAddr,
	state: Arc<ComputeState>,
	accept_loop: JoinHandle<()>,
}

impl MockServer {
	pub async fn start() -> Self {
		Self::start_with(ServerOptions::default()).await
	}

	pub async fn start_with(options: ServerOptions) -> Self {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		Self::serve(listener, options)
	}

	/// Serves on an already bound listener.
	pub fn serve(listener: TcpListener, options: ServerOptions) -> Self {
		let addr = listener.local_addr().unwrap();
		let state = Arc::new(ComputeState {
			options,
			people: Mutex::new(Vec::new()),
			active: AtomicUsize::new(0),
		});

		let accept_state = Arc::clone(&state);
		let accept_loop = tokio::spawn(async move {
			while let Ok((stream, _)) = listener.accept().await {
				let state = Arc::clone(&accept_state);
				state.active.fetch_add(1, Ordering::SeqCst);
				tokio::spawn(async move {
					match state.options.wire {
						Wire::Tcp => serve_tcp(stream, &state).await,
						Wire::WebSocket => serve_ws(stream, &state).await,
					}
					state.active.fetch_sub(1, Ordering::SeqCst);
				});
			}
		});

		Self { addr, state, accept_loop }
	}

	pub fn endpoint(&self) -> Endpoint {
		match self.state.options.wire {
			Wire::Tcp => Endpoint::tcp("127.0.0.1", self.addr.port()),
			Wire::WebSocket => Endpoint::ws("127.0.0.1", self.addr.port(), "/"),
		}
	}

	pub fn active_connections(&self) -> usize {
		self.state.active.load(Ordering::SeqCst)
	}

	pub async fn wait_for_connections(&self, count: usize) {
		tokio::time::timeout(Duration::from_secs(2), async {
			while self.active_connections() != count {
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.expect("server connection count never settled");
	}
}

impl Drop for MockServer {
	fn drop(&mut self) {
		self.accept_loop.abort();
	}
}

async fn serve_tcp(stream: TcpStream, state: &ComputeState) {
	let (transport, mut rx) = TcpTransport::from_stream(stream).unwrap();
	let (sender, receiver) = transport.into_parts();
	let reader = tokio::spawn(Box::new(receiver).run());
	let sender = Arc::new(tokio::sync::Mutex::new(sender));

	while let Some(value) = rx.recv().await {
		let Ok(request) = serde_json::from_value::<Request>(value) else {
			continue;
		};
		let (delay, response) = match handle(state, &request) {
			Reply::Now(response) => (Duration::ZERO, response),
			Reply::After(delay, response) => (delay, response),
			Reply::Never => continue,
			Reply::Crash => break,
		};
		let sender = Arc::clone(&sender);
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let _ = sender.lock().await.send(serde_json::to_value(response).unwrap()).await;
		});
	}

	let _ = Transport::close(&mut *sender.lock().await).await;
	reader.abort();
}

async fn serve_ws(stream: TcpStream, state: &ComputeState) {
	let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
		return;
	};
	let (sink, mut stream) = ws.split();
	let sink = Arc::new(tokio::sync::Mutex::new(sink));

	while let Some(Ok(message)) = stream.next().await {
		let WsMessage::Text(text) = message else {
			continue;
		};
		let Ok(request) = serde_json::from_str::<Request>(&text) else {
			continue;
		};
		let (delay, response) = match handle(state, &request) {
			Reply::Now(response) => (Duration::ZERO, response),
			Reply::After(delay, response) => (delay, response),
			Reply::Never => continue,
			Reply::Crash => break,
		};
		let sink = Arc::clone(&sink);
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let text = serde_json::to_string(&response).unwrap();
			let _ = sink.lock().await.send(WsMessage::Text(text)).await;
		});
	}
}

fn handle(state: &ComputeState, request: &Request) -> Reply {
	let id = request.id;
	let args = &request.args;

	match request.method.as_str() {
		HANDSHAKE_METHOD => {
			if !state.options.answer_handshake {
				return Reply::Never;
			}
			let info = ServerInfo {
				server: "mock-compute".to_string(),
				version: "0.1.0".to_string(),
				protocol: state.options.protocol,
			};
			Reply::Now(Response::success(id, serde_json::to_value(info).unwrap()))
		}
		"project::helloWorld" => Reply::Now(Response::success(id, json!("Hello, world!"))),
		"project::getArrayOfIntegers" => Reply::Now(Response::success(id, json!([1, 2, 3, 4, 5]))),
		"project::greet" => match (args.first().and_then(Value::as_str), args.get(1).and_then(Value::as_str), args.len()) {
			(Some(first), Some(last), 2) => Reply::Now(Response::success(id, json!(format!("Hello, {first} {last}!")))),
			_ => Reply::Now(Response::failure(id, ARGUMENT_ERROR, "greet expects (String, String)")),
		},
		"project::addPeople" => match (args.first().and_then(Value::as_str), args.len()) {
			(Some(name), 1) => {
				state.people.lock().push(name.to_string());
				Reply::Now(Response::success(id, Value::Null))
			}
			_ => Reply::Now(Response::failure(id, ARGUMENT_ERROR, "addPeople expects (String)")),
		},
		"project::getPeople" => Reply::Now(Response::success(id, json!(*state.people.lock()))),
		"project::sleep" => {
			let ms = args.first().and_then(Value::as_u64).unwrap_or(0);
			let tag = args.get(1).cloned().unwrap_or(Value::Null);
			Reply::After(Duration::from_millis(ms), Response::success(id, tag))
		}
		"project::fail" => {
			let mut response = Response::failure(id, "RuntimeError", "intentional failure");
			if let Some(wrapper) = response.error.as_mut() {
				wrapper.error.stack = Some("at project::fail (project.gcl:12)".to_string());
			}
			Reply::Now(response)
		}
		"project::never" => Reply::Never,
		"project::crash" => Reply::Crash,
		other => Reply::Now(Response::failure(id, INVALID_METHOD_ERROR, format!("unknown method '{other}'"))),
	}
}
