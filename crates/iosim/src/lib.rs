//! Deterministic in-process connection simulator for protocol tests.
//!
//! Two protocol endpoints ("client" and "server") are wired together through
//! a pair of in-memory output buffers. Nothing moves until the test calls
//! [`Pump::step`] or [`Pump::flush`], so every exchange happens at a point the
//! test chose and can assert around.
//!
//! ## Architecture
//!
//! ```text
//!   client endpoint                          server endpoint
//!        │ write                                  │ write
//!        ▼                                        ▼
//!   SimTransport ──┐                      ┌── SimTransport
//!   (DuplexBuffer) │                      │  (DuplexBuffer)
//!                  └──────►  Pump  ◄──────┘
//!                     drain, deliver to peer,
//!                     propagate close signals
//! ```
//!
//! # Invariants
//!
//! - No byte is lost, duplicated or reordered within a direction
//! - Within a step, server output is delivered before client output
//! - On a simultaneous close, the server-initiated close resolves first
//! - Strictly single threaded: handles are `Rc`, nothing is `Send`
//!
//! ## Example
//!
//! ```rust,ignore
//! use iosim::{PumpConfig, connect};
//!
//! let (client, server, mut pump) = connect(MyClient::new(), MyServer::new(), PumpConfig::default())?;
//!
//! client.borrow_mut().send_line(b"PING")?;
//! assert!(pump.step(false)?);  // PING reaches the server
//! assert!(pump.step(false)?);  // PONG reaches the client
//! assert!(!pump.step(false)?); // quiescent
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod connect;
mod endpoint;
mod error;
mod pump;
mod transport;

pub use buffer::DuplexBuffer;
pub use config::{DEFAULT_MAX_FLUSH_ITERATIONS, PumpConfig};
pub use connect::{connect, with_connected_pair};
pub use endpoint::{DisconnectReason, Endpoint, EndpointRef};
pub use error::{PumpError, TransportError};
pub use pump::Pump;
pub use transport::{Producer, Side, SimAddress, SimTransport};
