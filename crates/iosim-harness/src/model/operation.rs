//! Operations for model-based testing.
//!
//! Operations are generated by proptest or a fuzzer and applied to both the
//! model and a real pump.

use arbitrary::Arbitrary;

/// Operations that can be applied to a simulated connection.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client queues bytes for the server.
    ClientWrite {
        /// Bytes to queue.
        payload: SidePayload,
    },

    /// Server queues bytes for the client.
    ServerWrite {
        /// Bytes to queue.
        payload: SidePayload,
    },

    /// Client asks to close.
    ClientClose,

    /// Server asks to close.
    ServerClose,

    /// One pump step.
    Step,

    /// Pump until quiescent.
    Flush,
}

/// Compact payload description.
///
/// Keeps generated cases small while still exercising multi-chunk traffic.
/// The bytes are derived deterministically from the seed.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct SidePayload {
    /// Content seed.
    pub seed: u8,
    /// Length hint (0-3 maps to empty/small/medium/large).
    pub size_class: u8,
}

impl SidePayload {
    /// Expand to actual bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        let len = match self.size_class % 4 {
            0 => 0,
            1 => 6,
            2 => 64,
            _ => 512,
        };

        (0..len).map(|i| self.seed.wrapping_add(i as u8)).collect()
    }
}

/// Result of applying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation had no pump outcome (writes, close requests).
    Ok,

    /// A step or flush ran; `true` if anything moved.
    Moved(bool),

    /// Flush hit its ceiling.
    NoQuiescence,
}
