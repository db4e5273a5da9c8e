//! Container engine adapters for the berth gateway.
//!
//! Defines the [`ContainerEngine`] operations the gateway relies on and the
//! [`EngineConnector`] that hands out one handle per request, with a Docker
//! implementation over `bollard` and an in-process implementation.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod docker;
pub mod error;
pub mod memory;

pub use backend::{ContainerEngine, EngineConnector};
pub use docker::{DockerConnector, DockerEngine};
pub use error::EngineError;
pub use memory::{EngineCall, MemoryConnector, MemoryEngine};
