//! Container summaries, run requests and requested state transitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ContainerId, CoreError};

/// A container as surfaced by `GET /containers` and `GET /containers/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    /// Engine-reported status, e.g. `created`, `running`, `exited`.
    pub status: String,
    /// First tag of the container's image; `null` when the image is untagged.
    pub image: Option<String>,
}

impl ContainerSummary {
    /// Build a summary. A leading `/` on `name` is stripped, as engines
    /// report names rooted at the daemon namespace.
    #[must_use]
    pub fn new(
        id: ContainerId,
        name: &str,
        status: impl Into<String>,
        image: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.strip_prefix('/').unwrap_or(name).to_owned(),
            status: status.into(),
            image,
        }
    }
}

/// Target state accepted by `PUT /containers/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesiredState {
    /// Start the container.
    Running,
    /// Stop the container.
    Stopped,
}

impl DesiredState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesiredState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "stopped" => Ok(Self::Stopped),
            other => Err(CoreError::InvalidDesiredState {
                value: other.to_owned(),
            }),
        }
    }
}

/// Parameters of a detached container run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RunSpec {
    /// Image reference exactly as the caller supplied it.
    pub image: String,
    /// Command words. Empty means the image's default command.
    pub command: Vec<String>,
    /// Container name. `None` lets the engine choose one.
    pub name: Option<String>,
}

impl RunSpec {
    /// A run of `image` with its default command and an engine-chosen name.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: Vec::new(),
            name: None,
        }
    }

    /// Set the command from a shell-style command line.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidCommand`] if the line has unbalanced quotes
    /// or a dangling escape.
    pub fn with_command_line(mut self, line: &str) -> Result<Self, CoreError> {
        self.command = shell_words::split(line).map_err(|e| CoreError::InvalidCommand {
            command: line.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    /// Set the container name. An empty name leaves naming to the engine.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }
}

/// Name given to containers created without an explicit `name`.
///
/// Second resolution: two runs in the same second get the same name and the
/// engine rejects the second one.
#[must_use]
pub fn default_container_name(now: DateTime<Utc>) -> String {
    format!("container-{}", now.timestamp())
}
