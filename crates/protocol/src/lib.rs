//! Wire types for the rcall protocol.
//!
//! This crate contains the serde-serializable types exchanged with a remote
//! compute service: request and response envelopes, the error payload, the
//! handshake exchange, and validated method names.
//!
//! Types in this crate are:
//! - **Pure data**: No I/O, no runtime dependencies
//! - **1:1 with the wire**: Field names match what the server sends
//!
//! Connection handling lives in `rcall-runtime`; the session API in `rcall`.

pub mod handshake;
pub mod message;
pub mod method;

pub use handshake::*;
pub use message::*;
pub use method::*;
