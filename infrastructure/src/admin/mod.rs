//! Admin HTTP surface.
//!
//! A small axum router over the model registry: list, add, and delete
//! models at runtime. Changes persist through the registry file, so they
//! survive restarts and show up in the next registration snapshot.

use crate::registry::{FileModelRegistry, RegistryError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};
use tokiame_application::ModelCatalog;
use tokiame_domain::ModelDescriptor;

#[derive(Deserialize)]
struct AddModelRequest {
    model: ModelDescriptor,
}

#[derive(Deserialize)]
struct DeleteModelRequest {
    id: String,
}

pub fn router(registry: Arc<FileModelRegistry>) -> Router {
    Router::new()
        .route(
            "/api/models",
            get(list_models).post(add_model).delete(delete_model),
        )
        .with_state(registry)
}

/// Binds `addr` and serves the admin API until the process exits.
pub async fn serve(addr: &str, registry: Arc<FileModelRegistry>) -> std::io::Result<()> {
    info!(addr, "admin API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(registry)).await
}

async fn list_models(State(registry): State<Arc<FileModelRegistry>>) -> Json<Value> {
    Json(json!({ "models": registry.snapshot() }))
}

async fn add_model(
    State(registry): State<Arc<FileModelRegistry>>,
    Json(request): Json<AddModelRequest>,
) -> (StatusCode, Json<Value>) {
    let id = request.model.id.clone();
    match registry.add_model(request.model) {
        Ok(()) => {
            info!(id, "model added via admin API");
            (
                StatusCode::CREATED,
                Json(json!({ "message": "model added", "model_id": id })),
            )
        }
        Err(RegistryError::DuplicateModel(_)) => {
            warn!(id, "attempted to add existing model");
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "model with this id already exists" })),
            )
        }
        Err(e) => {
            error!(id, "failed to add model: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn delete_model(
    State(registry): State<Arc<FileModelRegistry>>,
    Json(request): Json<DeleteModelRequest>,
) -> (StatusCode, Json<Value>) {
    match registry.remove_model(&request.id) {
        Ok(()) => {
            info!(id = request.id, "model deleted via admin API");
            (
                StatusCode::OK,
                Json(json!({ "message": "model deleted", "model_id": request.id })),
            )
        }
        Err(RegistryError::UnknownModel(_)) => {
            warn!(id = request.id, "attempted to delete unknown model");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "model with this id not found" })),
            )
        }
        Err(e) => {
            error!(id = request.id, "failed to delete model: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
