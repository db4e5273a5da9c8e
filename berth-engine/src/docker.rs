//! Docker engine backend implementation.
//!
//! Talks to a Docker-compatible daemon through its management API using
//! `bollard`. Connection settings come from the ambient environment
//! (`DOCKER_HOST`, or the platform's default local socket).

use std::collections::HashMap;
use std::pin::pin;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::{CreateImageOptions, ListImagesOptions};
use bollard::Docker;
use chrono::DateTime;
use futures::TryStreamExt;
use tracing::{debug, info};

use berth_core::{ContainerId, ContainerSummary, ImageReference, ImageSummary, RunSpec};

use crate::backend::{ContainerEngine, EngineConnector};
use crate::EngineError;

const UNTAGGED_PLACEHOLDER: &str = "<none>:<none>";

/// Opens a new Docker client for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerConnector;

impl DockerConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EngineConnector for DockerConnector {
    fn connect(&self) -> Result<Box<dyn ContainerEngine>, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Connect(e.to_string()))?;
        debug!("docker client connected");
        Ok(Box::new(DockerEngine::new(docker)))
    }
}

/// A single Docker client. Dropping it closes the client's connections.
#[derive(Debug)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    #[must_use]
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// First repository tag of an image, `None` if untagged or gone.
    async fn primary_tag(&self, image_id: &str) -> Result<Option<String>, EngineError> {
        match self.docker.inspect_image(image_id).await {
            Ok(image) => Ok(image
                .repo_tags
                .unwrap_or_default()
                .into_iter()
                .find(|t| t != UNTAGGED_PLACEHOLDER)),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, spec: &RunSpec) -> Result<String, DockerError> {
        let options = spec.name.as_ref().map(|name| CreateContainerOptions {
            name: name.clone(),
            platform: None,
        });
        let config = Config {
            image: Some(spec.image.clone()),
            cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
            ..Default::default()
        };
        let created = self.docker.create_container(options, config).await?;
        Ok(created.id)
    }
}

/// Docker answers 304 when a container is already in the requested state.
fn already_in_state(result: Result<(), DockerError>) -> Result<(), EngineError> {
    match result {
        Ok(()) => Ok(()),
        Err(DockerError::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let images = self.docker.list_images(Some(options)).await?;
        debug!(count = images.len(), "listed images");

        Ok(images
            .into_iter()
            .map(|img| {
                ImageSummary::new(
                    img.id,
                    img.repo_tags,
                    img.labels.into_iter().collect(),
                    DateTime::from_timestamp(img.created, 0).unwrap_or_default(),
                    img.size,
                )
            })
            .collect())
    }

    async fn pull_image(&self, reference: &ImageReference) -> Result<(), EngineError> {
        let options = CreateImageOptions {
            from_image: reference.repository().to_owned(),
            tag: reference.pull_tag().to_owned(),
            ..Default::default()
        };

        info!(image = %reference, "pulling image");
        let mut progress = pin!(self.docker.create_image(Some(options), None, None));
        while let Some(step) = progress.try_next().await? {
            if let Some(status) = step.status {
                debug!(image = %reference, %status, "pull progress");
            }
        }
        info!(image = %reference, "image pulled");
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        debug!(count = containers.len(), "listed containers");

        // Several containers usually share an image.
        let mut tags: HashMap<String, Option<String>> = HashMap::new();
        let mut summaries = Vec::with_capacity(containers.len());
        for c in containers {
            let image = match c.image_id {
                Some(image_id) => {
                    if let Some(tag) = tags.get(&image_id) {
                        tag.clone()
                    } else {
                        let tag = self.primary_tag(&image_id).await?;
                        tags.insert(image_id, tag.clone());
                        tag
                    }
                }
                None => None,
            };
            let name = c
                .names
                .and_then(|names| names.into_iter().next())
                .unwrap_or_default();
            summaries.push(ContainerSummary::new(
                ContainerId::new(c.id.unwrap_or_default()),
                &name,
                c.state.as_ref().map(ToString::to_string).unwrap_or_default(),
                image,
            ));
        }
        Ok(summaries)
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        let id = match self.create(spec).await {
            Ok(id) => id,
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                info!(image = %spec.image, "image not present locally");
                let reference = ImageReference::parse(&spec.image)?;
                self.pull_image(&reference).await?;
                self.create(spec).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await?;
        info!(container_id = %id, image = %spec.image, "container started");
        Ok(ContainerId::new(id))
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerSummary, EngineError> {
        let info = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await?;

        let image = match info.image.as_deref() {
            Some(image_id) => self.primary_tag(image_id).await?,
            None => None,
        };
        let status = info
            .state
            .and_then(|s| s.status)
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        Ok(ContainerSummary::new(
            ContainerId::new(info.id.unwrap_or_else(|| id.to_string())),
            info.name.as_deref().unwrap_or_default(),
            status,
            image,
        ))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        already_in_state(
            self.docker
                .start_container(id.as_str(), None::<StartContainerOptions<String>>)
                .await,
        )?;
        debug!(container_id = %id, "container started");
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        already_in_state(
            self.docker
                .stop_container(id.as_str(), None::<StopContainerOptions>)
                .await,
        )?;
        debug!(container_id = %id, "container stopped");
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await?;
        debug!(container_id = %id, "container removed");
        Ok(())
    }

    async fn container_logs(&self, id: &ContainerId, tail: usize) -> Result<Vec<u8>, EngineError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let chunks: Vec<_> = self
            .docker
            .logs(id.as_str(), Some(options))
            .try_collect()
            .await?;

        let mut output = Vec::new();
        for chunk in chunks {
            output.extend_from_slice(&chunk.into_bytes());
        }
        Ok(output)
    }
}
