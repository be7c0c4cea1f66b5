//! Real pump wrapper mirroring [`ModelPump`](crate::ModelPump)'s interface.

use iosim::{EndpointRef, Pump, PumpConfig, PumpError, Side, connect};

use crate::{
    endpoints::Recorder,
    model::{ObservableState, Operation, OperationResult},
};

/// A real [`Pump`] between two [`Recorder`]s.
pub struct PumpWorld {
    client: EndpointRef<Recorder>,
    server: EndpointRef<Recorder>,
    pump: Pump<Recorder, Recorder>,
}

impl PumpWorld {
    /// Connect two recorders with the given configuration.
    pub fn new(config: PumpConfig) -> Result<Self, PumpError> {
        let (client, server, pump) = connect(Recorder::new(), Recorder::new(), config)?;
        Ok(Self { client, server, pump })
    }

    /// The underlying pump.
    pub fn pump(&mut self) -> &mut Pump<Recorder, Recorder> {
        &mut self.pump
    }

    /// Apply an operation to the real pump.
    ///
    /// Hitting the flush ceiling is an [`OperationResult`], not an error, so
    /// it can be compared against the model.
    pub fn apply(&mut self, op: &Operation) -> Result<OperationResult, PumpError> {
        match op {
            Operation::ClientWrite { payload } => {
                let client = self.client.borrow();
                client.send(&payload.to_bytes()).map_err(|e| PumpError::endpoint(Side::Client, e))?;
                Ok(OperationResult::Ok)
            },
            Operation::ServerWrite { payload } => {
                let server = self.server.borrow();
                server.send(&payload.to_bytes()).map_err(|e| PumpError::endpoint(Side::Server, e))?;
                Ok(OperationResult::Ok)
            },
            Operation::ClientClose => {
                self.client.borrow().close().map_err(|e| PumpError::endpoint(Side::Client, e))?;
                Ok(OperationResult::Ok)
            },
            Operation::ServerClose => {
                self.server.borrow().close().map_err(|e| PumpError::endpoint(Side::Server, e))?;
                Ok(OperationResult::Ok)
            },
            Operation::Step => Self::outcome(self.pump.step(false)),
            Operation::Flush => Self::outcome(self.pump.flush(false)),
        }
    }

    fn outcome(result: Result<bool, PumpError>) -> Result<OperationResult, PumpError> {
        match result {
            Ok(moved) => Ok(OperationResult::Moved(moved)),
            Err(PumpError::NoQuiescence { .. }) => Ok(OperationResult::NoQuiescence),
            Err(err) => Err(err),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let client = self.client.borrow();
        let server = self.server.borrow();
        let client_transport = self.pump.client_transport();
        let server_transport = self.pump.server_transport();

        ObservableState {
            client_received: client.received().to_vec(),
            server_received: server.received().to_vec(),
            client_pending: client_transport.pending_output(),
            server_pending: server_transport.pending_output(),
            client_lost: client.lost().len(),
            server_lost: server.lost().len(),
            client_flags: (client_transport.is_disconnecting(), client_transport.is_disconnected()),
            server_flags: (server_transport.is_disconnecting(), server_transport.is_disconnected()),
        }
    }
}
