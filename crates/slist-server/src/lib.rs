//! Shopping list server: routes operation requests to the collection service.
//!
//! The server enforces the per-operation contracts (callback present, item
//! id present, payload valid), translates service results into the
//! three-outcome envelope, and provides the `RequestHandler` implementation
//! for the transport layer.

pub mod params;
pub mod router;

pub use router::ListServer;
