//! Completion callback for a single request.
//!
//! An [`Ack`] is consumed by the first reply, so a request can be
//! answered at most once.

use crate::error::ProtocolError;
use crate::jsonrpc::{RequestId, Response};
use crate::outcome::Outcome;

type Deliver = Box<dyn FnOnce(Response) + Send + 'static>;

/// Handle used to answer one request.
pub struct Ack {
    id: RequestId,
    deliver: Deliver,
}

impl Ack {
    /// Build an ack for `id`. `deliver` receives the finished response
    /// frame (the transport encodes and queues it for the socket).
    pub fn new(id: RequestId, deliver: impl FnOnce(Response) + Send + 'static) -> Self {
        Self {
            id,
            deliver: Box::new(deliver),
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Acknowledge with an operation outcome.
    pub fn send(self, outcome: Outcome) {
        (self.deliver)(Response::success(self.id, outcome));
    }

    /// Reject at the frame level (unknown method, server not running).
    pub fn reject(self, error: ProtocolError) {
        (self.deliver)(Response::error(Some(self.id), error));
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ack").field("id", &self.id).finish_non_exhaustive()
    }
}
