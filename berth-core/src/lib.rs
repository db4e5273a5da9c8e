//! Core types for the berth container engine gateway.
//!
//! Defines the values that cross the gateway: image and container
//! summaries, image references, requested state transitions, run
//! parameters and log snapshots. Nothing here performs I/O.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod container;
pub mod error;
pub mod id;
pub mod image;
pub mod logs;

pub use container::{default_container_name, ContainerSummary, DesiredState, RunSpec};
pub use error::CoreError;
pub use id::ContainerId;
pub use image::{ImageReference, ImageSummary, DEFAULT_TAG};
pub use logs::{LogSnapshot, LOG_TAIL_LINES};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_display_is_verbatim() {
        let id = ContainerId::new("3f4e9a");
        assert_eq!(id.to_string(), "3f4e9a");
        assert_eq!(id.as_str(), "3f4e9a");
    }

    #[test]
    fn container_id_prefix_matching() {
        let id = ContainerId::new("3f4e9a0b");
        assert!(id.matches_prefix("3f4e"));
        assert!(id.matches_prefix("3f4e9a0b"));
        assert!(!id.matches_prefix(""), "empty prefix must not match");
        assert!(!id.matches_prefix("3f4e9a0bc"));
    }

    #[test]
    fn container_id_serializes_as_plain_string() {
        let json = match serde_json::to_string(&ContainerId::new("abc")) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn core_error_display_includes_reason() {
        let err = CoreError::InvalidImageReference {
            reference: ":x".to_owned(),
            reason: "repository is empty".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains(":x"), "Display must include the reference");
        assert!(msg.contains("repository is empty"), "Display must include the reason");
    }
}
