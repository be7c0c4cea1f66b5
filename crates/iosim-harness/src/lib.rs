//! Test support for iosim pumps.
//!
//! Sample endpoints for exercising a [`Pump`](iosim::Pump), plus a reference
//! model for model-based testing.
//!
//! # Model-Based Testing
//!
//! The `model` module describes how bytes and close signals move between the
//! two sides without any of the pump's machinery. Operations are applied to
//! both the model and a [`PumpWorld`] (a real pump between two recorders) and
//! their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoints;
pub mod model;
mod world;

pub use endpoints::{Chatter, Failing, HarnessError, LineEcho, Recorder};
pub use model::{ModelPump, ObservableState, Operation, OperationResult, SidePayload};
pub use world::PumpWorld;

/// Install a test-friendly tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `warn`. Safe to call from
/// every test; only the first call installs anything.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
