//! Reference model for model-based testing.
//!
//! The model moves bytes between two plain queues and tracks close flags
//! with booleans. It has no transports, no producers and no endpoints, so it
//! is small enough to be obviously correct. It serves as the oracle against
//! which a real [`Pump`](iosim::Pump) is checked.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Deterministic: Same operations produce the same state

mod operation;
mod pump;

pub use operation::{Operation, OperationResult, SidePayload};
pub use pump::{ModelPump, ObservableState};
