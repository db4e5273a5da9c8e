//! Fuzz target: splitting a form-supplied `command` into words.

#![no_main]

use berth_core::RunSpec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Errors are expected for unbalanced quotes; only panics are bugs.
    let _ = RunSpec::new("alpine").with_command_line(data);
});
