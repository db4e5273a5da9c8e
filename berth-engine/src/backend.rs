//! Container engine abstraction traits.
//!
//! Allows swapping between a Docker daemon, an in-memory engine or any
//! other runtime without changing the HTTP layer.

use async_trait::async_trait;
use berth_core::{ContainerId, ContainerSummary, ImageReference, ImageSummary, RunSpec};

use crate::EngineError;

/// A connected handle to a container engine.
///
/// One handle serves one request. Dropping it releases the underlying
/// connection.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Enumerate all images known to the engine.
    ///
    /// # Errors
    /// Returns [`EngineError::Engine`] if the engine call fails.
    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError>;

    /// Pull an image and wait for the pull to complete.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if the registry has no such image,
    /// [`EngineError::Engine`] for any other failure.
    async fn pull_image(&self, reference: &ImageReference) -> Result<(), EngineError>;

    /// Enumerate all containers, including stopped ones.
    ///
    /// # Errors
    /// Returns [`EngineError::Engine`] if the engine call fails.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError>;

    /// Create and start a container without attaching to it.
    ///
    /// # Errors
    /// Returns [`EngineError::Engine`] on a name conflict, an unusable image
    /// or any other engine failure.
    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError>;

    /// Resolve a container by id, id prefix or name.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no container matches.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerSummary, EngineError>;

    /// Start a container. Starting a running container succeeds.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no container matches.
    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// Stop a container. Stopping a stopped container succeeds.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no container matches.
    async fn stop_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// Remove a container, killing it first if it is running.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no container matches.
    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError>;

    /// Fetch the last `tail` lines of combined stdout and stderr.
    ///
    /// # Errors
    /// Returns [`EngineError::NotFound`] if no container matches.
    async fn container_logs(&self, id: &ContainerId, tail: usize) -> Result<Vec<u8>, EngineError>;
}

/// Source of per-request engine handles.
pub trait EngineConnector: Send + Sync {
    /// Acquire a fresh handle.
    ///
    /// # Errors
    /// Returns [`EngineError::Connect`] if the engine cannot be reached or
    /// its connection settings are invalid.
    fn connect(&self) -> Result<Box<dyn ContainerEngine>, EngineError>;
}
