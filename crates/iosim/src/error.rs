//! Pump and transport error types.

use thiserror::Error;

use crate::transport::Side;

/// Errors surfaced by [`Pump`](crate::Pump) and the connection helpers.
#[derive(Debug, Error)]
pub enum PumpError {
    /// `flush` kept moving data past its ceiling.
    ///
    /// The endpoints under test are regenerating output for each other
    /// (runaway retransmission or ping-pong).
    #[error("pump did not reach quiescence after {iterations} steps")]
    NoQuiescence {
        /// The ceiling that was exceeded.
        iterations: usize,
    },

    /// An endpoint callback returned an error.
    ///
    /// The endpoint's own error is kept as `source` and can be recovered
    /// with `downcast_ref`.
    #[error("{side} endpoint failed: {source}")]
    Endpoint {
        /// Endpoint whose callback failed.
        side: Side,
        /// The endpoint's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl PumpError {
    /// Wrap an endpoint error, recording which side raised it.
    pub fn endpoint<E>(side: Side, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Endpoint { side, source: Box::new(source) }
    }

    /// Side that raised the error, if it came from an endpoint.
    pub fn side(&self) -> Option<Side> {
        match self {
            Self::Endpoint { side, .. } => Some(*side),
            Self::NoQuiescence { .. } => None,
        }
    }
}

/// Errors from [`SimTransport`](crate::SimTransport) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A producer is already attached to this transport.
    #[error("producer already registered on {side} transport")]
    ProducerAlreadyRegistered {
        /// Transport that rejected the registration.
        side: Side,
    },
}
