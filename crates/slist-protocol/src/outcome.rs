//! The three-outcome response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one operation, as seen by the client.
///
/// Serializes to exactly one of:
/// `{"status":"success","payload":..}`, `{"status":"fail","payload":{..}}`,
/// `{"status":"error","message":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    /// The operation completed.
    Success { payload: Value },
    /// The request was rejected for a reason the client can fix
    /// (bad payload, missing id, unknown item). Payload maps field → reason.
    Fail { payload: Value },
    /// Something unexpected went wrong. Only the message is exposed.
    Error { message: String },
}

impl Outcome {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn fail(payload: Value) -> Self {
        Self::Fail { payload }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Fail { .. } => "fail",
            Self::Error { .. } => "error",
        }
    }
}
