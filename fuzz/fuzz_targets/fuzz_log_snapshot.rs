//! Fuzz target: `LogSnapshot::from_bytes` on arbitrary engine output.
//!
//! Decoding is lossy and must never panic or exceed the tail limit.

#![no_main]

use berth_core::{LogSnapshot, LOG_TAIL_LINES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let snapshot = LogSnapshot::from_bytes(data);
    assert!(snapshot.len() <= LOG_TAIL_LINES);
});
