//! Client connection state tracking.

use std::time::Instant;

/// Lifecycle of one connection. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Represents a connected client.
#[derive(Debug)]
pub struct ClientConnection {
    /// Unique client ID
    pub id: String,
    /// When the client connected
    pub connected_at: Instant,
    pub state: ConnectionState,
    /// Requests received so far
    pub requests: u64,
    /// Last time we received any message from this client
    pub last_activity: Instant,
}

impl ClientConnection {
    pub fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            connected_at: now,
            state: ConnectionState::Connected,
            requests: 0,
            last_activity: now,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Record inbound traffic.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn record_request(&mut self) {
        self.requests += 1;
        self.touch();
    }

    /// Move to the terminal state. Further requests are not accepted.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }
}
