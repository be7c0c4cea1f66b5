//! Model pump.

use super::operation::{Operation, OperationResult};

/// One side of the model connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ModelSide {
    /// Written but not yet delivered.
    pending: Vec<u8>,
    /// Delivered from the peer.
    received: Vec<u8>,
    /// `connection_lost` notifications delivered to this side.
    lost: usize,
    disconnecting: bool,
    disconnected: bool,
}

impl ModelSide {
    fn close_pending(&self) -> bool {
        self.disconnecting && !self.disconnected
    }
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Bytes the client has received.
    pub client_received: Vec<u8>,
    /// Bytes the server has received.
    pub server_received: Vec<u8>,
    /// Bytes queued by the client and not yet delivered.
    pub client_pending: usize,
    /// Bytes queued by the server and not yet delivered.
    pub server_pending: usize,
    /// `connection_lost` calls seen by the client.
    pub client_lost: usize,
    /// `connection_lost` calls seen by the server.
    pub server_lost: usize,
    /// Client transport `(disconnecting, disconnected)`.
    pub client_flags: (bool, bool),
    /// Server transport `(disconnecting, disconnected)`.
    pub server_flags: (bool, bool),
}

/// Reference pump.
#[derive(Debug, Clone, Default)]
pub struct ModelPump {
    client: ModelSide,
    server: ModelSide,
}

impl ModelPump {
    /// Fresh, idle connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::ClientWrite { payload } => {
                self.client.pending.extend(payload.to_bytes());
                OperationResult::Ok
            },
            Operation::ServerWrite { payload } => {
                self.server.pending.extend(payload.to_bytes());
                OperationResult::Ok
            },
            Operation::ClientClose => {
                self.client.disconnecting = true;
                OperationResult::Ok
            },
            Operation::ServerClose => {
                self.server.disconnecting = true;
                OperationResult::Ok
            },
            Operation::Step => OperationResult::Moved(self.step()),
            Operation::Flush => OperationResult::Moved(self.flush()),
        }
    }

    /// Data first; otherwise one close, server-initiated first.
    fn step(&mut self) -> bool {
        let from_server = std::mem::take(&mut self.server.pending);
        let from_client = std::mem::take(&mut self.client.pending);

        if !from_server.is_empty() || !from_client.is_empty() {
            self.client.received.extend(from_server);
            self.server.received.extend(from_client);
            return true;
        }

        if self.server.close_pending() {
            self.server.disconnected = true;
            self.client.disconnecting = true;
            self.client.lost += 1;
            return true;
        }

        if self.client.close_pending() {
            self.client.disconnected = true;
            self.server.disconnecting = true;
            self.server.lost += 1;
            return true;
        }

        false
    }

    /// Every step consumes data or a close, so this always terminates.
    fn flush(&mut self) -> bool {
        let mut moved = false;
        while self.step() {
            moved = true;
        }
        moved
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            client_received: self.client.received.clone(),
            server_received: self.server.received.clone(),
            client_pending: self.client.pending.len(),
            server_pending: self.server.pending.len(),
            client_lost: self.client.lost,
            server_lost: self.server.lost,
            client_flags: (self.client.disconnecting, self.client.disconnected),
            server_flags: (self.server.disconnecting, self.server.disconnected),
        }
    }
}
