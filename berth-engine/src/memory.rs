//! In-process container engine.
//!
//! Keeps images and containers in a registry shared by every handle the
//! connector hands out. Nothing is executed: a "running" container is a
//! status string. Serves demos and frontend development without a daemon,
//! and lets the HTTP layer be exercised deterministically.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use berth_core::{ContainerId, ContainerSummary, ImageReference, ImageSummary, RunSpec};

use crate::backend::{ContainerEngine, EngineConnector};
use crate::EngineError;

/// One engine operation, as recorded by the in-memory engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    ListImages,
    PullImage(String),
    ListContainers,
    RunContainer(String),
    InspectContainer(ContainerId),
    StartContainer(ContainerId),
    StopContainer(ContainerId),
    RemoveContainer(ContainerId),
    ContainerLogs(ContainerId),
}

#[derive(Debug)]
struct MemoryContainer {
    id: ContainerId,
    name: String,
    image_id: String,
    status: String,
    logs: Vec<String>,
}

#[derive(Debug, Default)]
struct Registry {
    images: Vec<ImageSummary>,
    containers: Vec<MemoryContainer>,
    calls: Vec<EngineCall>,
    failure: Option<String>,
}

impl Registry {
    fn image_id_for(&self, tag: &str) -> Option<String> {
        self.images
            .iter()
            .find(|img| img.tags.iter().any(|t| t == tag))
            .map(|img| img.id.clone())
    }

    fn pull(&mut self, reference: &ImageReference) -> String {
        let tag = canonical_tag(reference);
        if let Some(id) = self.image_id_for(&tag) {
            return id;
        }
        let id = format!("sha256:{:x}", Sha256::digest(tag.as_bytes()));
        self.images.push(ImageSummary::new(
            id.clone(),
            vec![tag],
            BTreeMap::new(),
            Utc::now(),
            0,
        ));
        id
    }

    /// Resolve by full id, name, or unambiguous id prefix.
    fn resolve(&self, id: &ContainerId) -> Result<usize, EngineError> {
        let wanted = id.as_str();
        let name = wanted.strip_prefix('/').unwrap_or(wanted);
        if let Some(pos) = self
            .containers
            .iter()
            .position(|c| c.id == *id || c.name == name)
        {
            return Ok(pos);
        }

        let mut matches = self
            .containers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.id.matches_prefix(wanted))
            .map(|(pos, _)| pos);
        match (matches.next(), matches.next()) {
            (Some(pos), None) => Ok(pos),
            (Some(_), Some(_)) => Err(EngineError::Engine(format!(
                "multiple IDs found with provided prefix: {wanted}"
            ))),
            (None, _) => Err(EngineError::NotFound(format!("No such container: {wanted}"))),
        }
    }

    fn summary(&self, c: &MemoryContainer) -> ContainerSummary {
        let image = self
            .images
            .iter()
            .find(|img| img.id == c.image_id)
            .and_then(|img| img.primary_tag().map(str::to_owned));
        ContainerSummary::new(c.id.clone(), &c.name, c.status.clone(), image)
    }
}

/// Tag under which a pulled reference is recorded, e.g. `alpine:latest`.
fn canonical_tag(reference: &ImageReference) -> String {
    match reference.digest() {
        Some(digest) => format!("{}@{digest}", reference.repository()),
        None => format!("{}:{}", reference.repository(), reference.pull_tag()),
    }
}

#[derive(Debug, Default)]
struct Shared {
    registry: RwLock<Registry>,
    open_handles: AtomicUsize,
}

impl Shared {
    fn registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out [`MemoryEngine`] handles over one shared registry.
///
/// Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
}

impl MemoryConnector {
    /// Create an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an image available without recording a pull. Returns its id.
    pub fn insert_image(&self, reference: &ImageReference) -> String {
        self.shared.registry().pull(reference)
    }

    /// Append lines, oldest first, to a container's log buffer.
    ///
    /// Returns `false` if the container does not exist.
    pub fn append_logs<I, S>(&self, id: &ContainerId, lines: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = self.shared.registry();
        let Ok(pos) = registry.resolve(id) else {
            return false;
        };
        registry.containers[pos]
            .logs
            .extend(lines.into_iter().map(Into::into));
        true
    }

    /// Make every subsequent engine operation fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.shared.registry().failure = Some(message.into());
    }

    pub fn clear_failure(&self) {
        self.shared.registry().failure = None;
    }

    /// Operations performed so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.registry().calls.clone()
    }

    /// Number of handles acquired and not yet dropped.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }
}

impl EngineConnector for MemoryConnector {
    fn connect(&self) -> Result<Box<dyn ContainerEngine>, EngineError> {
        self.shared.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryEngine {
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// A handle onto a [`MemoryConnector`]'s registry.
#[derive(Debug)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    /// Record `call` and lock the registry, or fail if a failure is injected.
    fn begin(&self, call: EngineCall) -> Result<RwLockWriteGuard<'_, Registry>, EngineError> {
        let mut registry = self.shared.registry();
        registry.calls.push(call);
        if let Some(message) = registry.failure.clone() {
            return Err(EngineError::Engine(message));
        }
        Ok(registry)
    }
}

impl Drop for MemoryEngine {
    fn drop(&mut self) {
        self.shared.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContainerEngine for MemoryEngine {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        let registry = self.begin(EngineCall::ListImages)?;
        Ok(registry.images.clone())
    }

    async fn pull_image(&self, reference: &ImageReference) -> Result<(), EngineError> {
        let mut registry = self.begin(EngineCall::PullImage(reference.to_string()))?;
        registry.pull(reference);
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        let registry = self.begin(EngineCall::ListContainers)?;
        Ok(registry
            .containers
            .iter()
            .map(|c| registry.summary(c))
            .collect())
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<ContainerId, EngineError> {
        let mut registry = self.begin(EngineCall::RunContainer(spec.image.clone()))?;
        let reference = ImageReference::parse(&spec.image)?;

        let image_id = match registry.image_id_for(&canonical_tag(&reference)) {
            Some(id) => id,
            None => {
                registry.calls.push(EngineCall::PullImage(reference.to_string()));
                registry.pull(&reference)
            }
        };

        let id = ContainerId::new(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ));
        let name = match &spec.name {
            Some(name) => {
                if let Some(owner) = registry.containers.iter().find(|c| &c.name == name) {
                    return Err(EngineError::Engine(format!(
                        "Conflict. The container name \"/{name}\" is already in use by container \"{}\". \
                         You have to remove (or rename) that container to be able to reuse that name.",
                        owner.id
                    )));
                }
                name.clone()
            }
            None => format!("berth_{}", &id.as_str()[..12]),
        };

        registry.containers.push(MemoryContainer {
            id: id.clone(),
            name,
            image_id,
            status: "running".to_owned(),
            logs: Vec::new(),
        });
        Ok(id)
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerSummary, EngineError> {
        let registry = self.begin(EngineCall::InspectContainer(id.clone()))?;
        let pos = registry.resolve(id)?;
        Ok(registry.summary(&registry.containers[pos]))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        let mut registry = self.begin(EngineCall::StartContainer(id.clone()))?;
        let pos = registry.resolve(id)?;
        "running".clone_into(&mut registry.containers[pos].status);
        Ok(())
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        let mut registry = self.begin(EngineCall::StopContainer(id.clone()))?;
        let pos = registry.resolve(id)?;
        "exited".clone_into(&mut registry.containers[pos].status);
        Ok(())
    }

    async fn remove_container(&self, id: &ContainerId) -> Result<(), EngineError> {
        let mut registry = self.begin(EngineCall::RemoveContainer(id.clone()))?;
        let pos = registry.resolve(id)?;
        registry.containers.remove(pos);
        Ok(())
    }

    async fn container_logs(&self, id: &ContainerId, tail: usize) -> Result<Vec<u8>, EngineError> {
        let registry = self.begin(EngineCall::ContainerLogs(id.clone()))?;
        let pos = registry.resolve(id)?;
        let logs = &registry.containers[pos].logs;
        let keep = logs.len().saturating_sub(tail);
        let mut output = String::new();
        for line in &logs[keep..] {
            output.push_str(line);
            output.push('\n');
        }
        Ok(output.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(s: &str) -> ImageReference {
        match ImageReference::parse(s) {
            Ok(r) => r,
            Err(e) => panic!("bad reference {s}: {e}"),
        }
    }

    fn engine(connector: &MemoryConnector) -> Box<dyn ContainerEngine> {
        match connector.connect() {
            Ok(e) => e,
            Err(e) => panic!("connect failed: {e}"),
        }
    }

    async fn run(engine: &dyn ContainerEngine, spec: RunSpec) -> ContainerId {
        match engine.run_container(&spec).await {
            Ok(id) => id,
            Err(e) => panic!("run failed: {e}"),
        }
    }

    #[test]
    fn memory_connector_counts_open_handles() {
        let connector = MemoryConnector::new();
        let first = engine(&connector);
        let second = engine(&connector);
        assert_eq!(connector.open_handles(), 2);
        drop(first);
        assert_eq!(connector.open_handles(), 1);
        drop(second);
        assert_eq!(connector.open_handles(), 0, "dropped handles must be released");
    }

    #[tokio::test]
    async fn memory_pull_records_image_under_latest() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        let pulled = engine.pull_image(&reference("alpine")).await;
        assert!(pulled.is_ok());

        let images = match engine.list_images().await {
            Ok(i) => i,
            Err(e) => panic!("list failed: {e}"),
        };
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].tags, vec!["alpine:latest".to_owned()]);
        assert!(images[0].id.starts_with("sha256:"));
    }

    #[tokio::test]
    async fn memory_run_pulls_missing_image_then_creates() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        let id = run(engine.as_ref(), RunSpec::new("alpine:3.19")).await;
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(
            connector.calls(),
            vec![
                EngineCall::RunContainer("alpine:3.19".to_owned()),
                EngineCall::PullImage("alpine:3.19".to_owned()),
            ]
        );

        let summary = match engine.inspect_container(&id).await {
            Ok(s) => s,
            Err(e) => panic!("inspect failed: {e}"),
        };
        assert_eq!(summary.status, "running");
        assert_eq!(summary.image.as_deref(), Some("alpine:3.19"));
    }

    #[tokio::test]
    async fn memory_resolves_by_prefix_and_name() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        let id = run(engine.as_ref(), RunSpec::new("alpine").with_name("web")).await;

        let by_prefix = engine
            .inspect_container(&ContainerId::new(&id.as_str()[..10]))
            .await;
        assert!(matches!(by_prefix, Ok(ref s) if s.id == id));

        let by_name = engine.inspect_container(&ContainerId::new("web")).await;
        assert!(matches!(by_name, Ok(ref s) if s.name == "web"));
    }

    #[tokio::test]
    async fn memory_duplicate_name_is_an_engine_error() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        run(engine.as_ref(), RunSpec::new("alpine").with_name("web")).await;
        let second = engine
            .run_container(&RunSpec::new("alpine").with_name("web"))
            .await;
        match second {
            Err(EngineError::Engine(msg)) => assert!(msg.contains("already in use")),
            other => panic!("expected name conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn memory_stop_start_remove_lifecycle() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        let id = run(engine.as_ref(), RunSpec::new("alpine")).await;

        assert!(engine.stop_container(&id).await.is_ok());
        assert!(matches!(engine.inspect_container(&id).await, Ok(ref s) if s.status == "exited"));
        assert!(engine.start_container(&id).await.is_ok());
        assert!(matches!(engine.inspect_container(&id).await, Ok(ref s) if s.status == "running"));

        assert!(engine.remove_container(&id).await.is_ok());
        assert!(matches!(
            engine.remove_container(&id).await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            engine.inspect_container(&id).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn memory_logs_return_requested_tail_oldest_first() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        let id = run(engine.as_ref(), RunSpec::new("alpine")).await;
        assert!(connector.append_logs(&id, ["one", "two", "three"]));

        let output = match engine.container_logs(&id, 2).await {
            Ok(o) => o,
            Err(e) => panic!("logs failed: {e}"),
        };
        assert_eq!(output, b"two\nthree\n");
    }

    #[tokio::test]
    async fn memory_injected_failure_surfaces_message() {
        let connector = MemoryConnector::new();
        let engine = engine(&connector);
        connector.fail_with("engine unreachable");
        match engine.list_images().await {
            Err(EngineError::Engine(msg)) => assert_eq!(msg, "engine unreachable"),
            other => panic!("expected injected failure, got {other:?}"),
        }
        connector.clear_failure();
        assert!(engine.list_images().await.is_ok());
    }
}
