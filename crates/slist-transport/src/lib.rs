//! Shopping list transport layer.
//!
//! Provides the WebSocket transport for the shopping list server.
//! The transport layer handles:
//! - Connection lifecycle (open, message, close)
//! - Frame decoding and per-request acknowledgement callbacks
//! - Running each request as an independent task
//! - Tearing a connection down on protocol violations
//! - Notification broadcasting to connected clients
//!
//! The transport is decoupled from the list logic via the `RequestHandler` trait.

pub mod client;
pub mod error;
pub mod server;

pub use client::{ClientConnection, ConnectionState};
pub use error::TransportError;
pub use server::{Disposition, RequestHandler, TransportConfig, TransportServer};
