//! Fuzz target: `ImageReference::parse` on arbitrary strings.
//!
//! Parsing must never panic, and anything it accepts must print back to a
//! reference that parses to the same value.

#![no_main]

use berth_core::ImageReference;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(reference) = ImageReference::parse(data) {
        assert!(!reference.repository().is_empty());
        assert!(!reference.pull_tag().is_empty());
        let reparsed = ImageReference::parse(&reference.to_string());
        assert_eq!(reparsed.ok().as_ref(), Some(&reference));
    }
});
