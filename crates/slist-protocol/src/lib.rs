//! Shopping list protocol types.
//!
//! JSON-RPC 2.0 style framing for the shopping list server. A request's
//! `id` doubles as its completion callback: the server acknowledges a
//! request by echoing the id together with an [`Outcome`]. This crate is
//! the single source of truth for frames, outcomes, method names,
//! notification names and error codes.

pub mod ack;
pub mod error;
pub mod jsonrpc;
pub mod methods;
pub mod notifications;
pub mod outcome;

pub use ack::Ack;
pub use error::{ProtocolError, ProtocolErrorCode};
pub use jsonrpc::{
    ErrorResponse, Notification, Request, RequestId, Response, SuccessResponse,
};
pub use methods::{MethodName, Methods, Operation};
pub use notifications::{NotificationName, Notifications};
pub use outcome::Outcome;
