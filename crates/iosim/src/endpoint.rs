//! The protocol state machine contract consumed by the pump.

use std::{cell::RefCell, rc::Rc};

use bytes::Bytes;
use thiserror::Error;

use crate::transport::SimTransport;

/// Endpoint shared between the test body and the pump.
pub type EndpointRef<E> = Rc<RefCell<E>>;

/// Why a simulated connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Orderly close requested by the peer.
    #[error("connection done")]
    ConnectionDone,
}

/// A protocol endpoint driven by the pump.
///
/// The endpoint writes its output through the [`SimTransport`] it receives
/// in [`connection_made`](Self::connection_made) and asks to close with
/// [`SimTransport::lose_connection`]. Errors are not handled by the pump:
/// they abort the current step and reach the caller tagged with the side
/// that raised them.
///
/// Both outputs are drained before either side is delivered to. If the
/// client's `data_received` fails, the bytes the client wrote for the
/// server in that step have already been drained and are dropped.
pub trait Endpoint {
    /// Error raised by the endpoint's callbacks.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The connection is up. Greetings written here go out on the first flush.
    fn connection_made(&mut self, transport: SimTransport) -> Result<(), Self::Error>;

    /// Bytes arrived from the peer.
    fn data_received(&mut self, data: Bytes) -> Result<(), Self::Error>;

    /// The connection is gone. Called at most once per side by the pump.
    fn connection_lost(&mut self, reason: DisconnectReason) -> Result<(), Self::Error>;
}
