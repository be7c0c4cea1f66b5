//! Fuzz target for [`Pump`] against the reference model
//!
//! # Strategy
//!
//! - Operation sequences: Arbitrary interleavings of writes, close requests,
//!   single steps and flushes on both sides
//! - Flush ceiling: A small ceiling is used on some runs so the ceiling path
//!   is exercised alongside normal quiescence
//!
//! # Invariants
//!
//! - Real pump and model agree on every step/flush result
//! - Observable state (delivered bytes, pending bytes, close flags,
//!   `connection_lost` counts) matches the model after every operation
//! - A flush never hits its ceiling with well-behaved endpoints unless the
//!   ceiling is smaller than the work pending
//! - NEVER panic inside the pump

#![no_main]

use arbitrary::Arbitrary;
use iosim::PumpConfig;
use iosim_harness::{ModelPump, Operation, OperationResult, PumpWorld};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// `0` means the default ceiling.
    ceiling: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let config = match input.ceiling {
        0 => PumpConfig::default(),
        n => PumpConfig::default().with_max_flush_iterations(usize::from(n)),
    };

    let mut model = ModelPump::new();
    let Ok(mut real) = PumpWorld::new(config) else {
        return;
    };

    for op in input.ops.iter().take(256) {
        let actual = real.apply(op).expect("recorders never fail");
        if actual == OperationResult::NoQuiescence {
            // The model has no ceiling; a small one may legitimately trip.
            // Each side can need at most one data step and one close step.
            assert!(usize::from(input.ceiling) < 4, "ceiling tripped with well-behaved endpoints");
            return;
        }

        let expected = model.apply(op);
        assert_eq!(expected, actual, "result mismatch on {op:?}");
        assert_eq!(model.observable_state(), real.observable_state(), "state mismatch on {op:?}");
    }
});
