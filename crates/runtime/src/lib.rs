//! rcall runtime - transports, request correlation, and errors
//!
//! This crate provides the low-level infrastructure for talking to a remote
//! compute service:
//!
//! - **Transport**: length-prefixed JSON frames over TCP, or JSON over WebSocket
//! - **Connection**: request/response correlation by request ID
//! - **Errors**: the [`Error`] enum and its [`ErrorKind`] classification
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │    rcall    │  Session lifecycle, endpoint resolution
//! └──────┬──────┘
//! ┌──────▼──────┐
//! │rcall-runtime│  This crate
//! │  ┌────────┐ │
//! │  │ Conn   │ │  ID correlation, pending table
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  TCP frames / WebSocket
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::Connection;
pub use error::{Error, ErrorKind, Result};
pub use transport::{
	FramedReceiver, FramedSender, FramedTransport, MAX_FRAME_SIZE, TcpTransport, Transport, TransportParts, TransportReceiver,
	WebSocketReceiver, WebSocketSender, WebSocketTransport,
};
