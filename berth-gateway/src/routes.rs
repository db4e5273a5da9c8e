//! Axum route handlers for the berth gateway API.
//!
//! Each handler acquires one engine handle, performs its engine call(s) and
//! drops the handle before the response is written.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use berth_core::{
    default_container_name, ContainerId, ContainerSummary, DesiredState, ImageReference,
    ImageSummary, LogSnapshot, RunSpec, LOG_TAIL_LINES,
};
use berth_engine::EngineConnector;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{error::GatewayError, form::FormFields};

// ── Shared state ─────────────────────────────────────────────────────────────

type Connector = Arc<dyn EngineConnector>;

const IMAGE_REQUIRED: &str = "Image name is required";

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PullImageBody {
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateContainerBody {
    pub image: Option<String>,
    pub command: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContainerBody {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateContainerResponse {
    pub message: &'static str,
    pub container_id: ContainerId,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub status: &'static str,
    pub logs: Vec<String>,
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router.
///
/// API routes are mounted under `base_path` (`""` mounts them at the root);
/// `/health` is always at the root.
pub fn create_router(connector: Connector, base_path: &str) -> Router {
    let api = Router::new()
        .route("/images", get(list_images).post(pull_image))
        .route("/containers", get(list_containers).post(create_container))
        .route(
            "/containers/{id}",
            get(get_container)
                .put(update_container)
                .delete(remove_container),
        )
        .route("/containers/{id}/logs", get(container_logs))
        .with_state(connector);

    let router = Router::new().route("/health", get(health));
    let router = if base_path.is_empty() {
        router.merge(api)
    } else {
        router.nest(base_path, api)
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health` — liveness probe. Does not contact the engine.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// `GET /images` — every image known to the engine.
///
/// # Errors
/// Returns [`GatewayError::Engine`] if the engine call fails.
pub async fn list_images(
    State(connector): State<Connector>,
) -> Result<Json<Vec<ImageSummary>>, GatewayError> {
    let engine = connector.connect()?;
    Ok(Json(engine.list_images().await?))
}

/// `POST /images` — pull an image and wait for the pull to finish.
///
/// # Errors
/// Returns [`GatewayError::Validation`] if `image` is missing or empty, and
/// [`GatewayError::Engine`] if the reference is malformed or the pull fails.
pub async fn pull_image(
    State(connector): State<Connector>,
    FormFields(body): FormFields<PullImageBody>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let image = required(body.image, IMAGE_REQUIRED)?;
    let reference =
        ImageReference::parse(&image).map_err(|e| GatewayError::Engine(e.to_string()))?;

    let engine = connector.connect()?;
    engine.pull_image(&reference).await?;
    info!(image = %reference, "image pulled");
    Ok(Json(MessageResponse {
        message: "Image pulled successfully",
    }))
}

/// `GET /containers` — every container, including stopped ones.
///
/// # Errors
/// Returns [`GatewayError::Engine`] if the engine call fails.
pub async fn list_containers(
    State(connector): State<Connector>,
) -> Result<Json<Vec<ContainerSummary>>, GatewayError> {
    let engine = connector.connect()?;
    Ok(Json(engine.list_containers().await?))
}

/// `POST /containers` — create and start a detached container.
///
/// Without `name` the container is called `container-<unix-seconds>`.
///
/// # Errors
/// Returns [`GatewayError::Validation`] if `image` is missing or empty or
/// `command` cannot be split into words, and [`GatewayError::Engine`] if the
/// engine refuses the run.
pub async fn create_container(
    State(connector): State<Connector>,
    FormFields(body): FormFields<CreateContainerBody>,
) -> Result<impl IntoResponse, GatewayError> {
    let image = required(body.image, IMAGE_REQUIRED)?;
    let name = body
        .name
        .unwrap_or_else(|| default_container_name(Utc::now()));
    let spec = RunSpec::new(image)
        .with_command_line(body.command.as_deref().unwrap_or_default())?
        .with_name(name);

    let engine = connector.connect()?;
    let container_id = engine.run_container(&spec).await?;
    info!(%container_id, image = %spec.image, "container created");
    Ok((
        StatusCode::CREATED,
        Json(CreateContainerResponse {
            message: "Container created successfully",
            container_id,
        }),
    ))
}

/// `GET /containers/{id}` — a single container.
///
/// # Errors
/// Returns [`GatewayError::NotFound`] if the engine has no such container.
pub async fn get_container(
    State(connector): State<Connector>,
    Path(id): Path<String>,
) -> Result<Json<ContainerSummary>, GatewayError> {
    let engine = connector.connect()?;
    Ok(Json(engine.inspect_container(&ContainerId::new(id)).await?))
}

/// `PUT /containers/{id}` — start (`status=running`) or stop
/// (`status=stopped`) a container.
///
/// The container is resolved before `status` is checked, so an unknown id
/// is a 404 whatever the body says.
///
/// # Errors
/// Returns [`GatewayError::NotFound`] for an unknown id and
/// [`GatewayError::Validation`] for any other `status`.
pub async fn update_container(
    State(connector): State<Connector>,
    Path(id): Path<String>,
    FormFields(body): FormFields<UpdateContainerBody>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let engine = connector.connect()?;
    let container = engine.inspect_container(&ContainerId::new(id)).await?;

    let message = match body.status.as_deref().unwrap_or_default().parse::<DesiredState>()? {
        DesiredState::Running => {
            engine.start_container(&container.id).await?;
            "Container started successfully"
        }
        DesiredState::Stopped => {
            engine.stop_container(&container.id).await?;
            "Container stopped successfully"
        }
    };
    info!(container_id = %container.id, message, "container state changed");
    Ok(Json(MessageResponse { message }))
}

/// `DELETE /containers/{id}` — force-remove a container, running or not.
///
/// # Errors
/// Returns [`GatewayError::NotFound`] if the engine has no such container.
pub async fn remove_container(
    State(connector): State<Connector>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, GatewayError> {
    let engine = connector.connect()?;
    let container = engine.inspect_container(&ContainerId::new(id)).await?;
    engine.remove_container(&container.id).await?;
    info!(container_id = %container.id, "container removed");
    Ok(Json(MessageResponse {
        message: "Container removed successfully",
    }))
}

/// `GET /containers/{id}/logs` — the last 100 log lines, newest first.
///
/// # Errors
/// Returns [`GatewayError::NotFound`] if the engine has no such container.
pub async fn container_logs(
    State(connector): State<Connector>,
    Path(id): Path<String>,
) -> Result<Json<LogsResponse>, GatewayError> {
    let engine = connector.connect()?;
    let container = engine.inspect_container(&ContainerId::new(id)).await?;
    let raw = engine.container_logs(&container.id, LOG_TAIL_LINES).await?;
    Ok(Json(LogsResponse {
        status: "success",
        logs: LogSnapshot::from_bytes(&raw).into_lines(),
    }))
}

/// A present, non-empty form field.
fn required(value: Option<String>, message: &str) -> Result<String, GatewayError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::Validation(message.to_owned()))
}
