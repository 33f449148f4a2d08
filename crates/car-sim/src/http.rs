use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use car_upload_core::api::{
    DeleteAllModelsRequest, ErrorResponse, UploadRequest, UploadResponse, UploadStatusRequest,
    UploadStatusResponse, DELETE_ALL_MODELS_PATH, UPLOAD_PATH, UPLOAD_STATUS_PATH,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::service::{CarSimService, SimError};

/// Body of a delete-all-models reply: the cars that were cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteAllModelsResponse {
    pub deleted: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    svc: Arc<CarSimService>,
}

pub fn router(svc: Arc<CarSimService>) -> Router {
    let state = AppState { svc };
    Router::new()
        .route("/healthz", get(healthz))
        .route(UPLOAD_PATH, post(upload))
        .route(UPLOAD_STATUS_PATH, post(upload_status))
        .route(DELETE_ALL_MODELS_PATH, post(delete_all_models))
        .route("/cars/{instance_id}/models", get(installed_models))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn upload(
    State(st): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let command_id = st.svc.upload(&req.instance_id, &req.key).await?;
    Ok(Json(command_id))
}

async fn upload_status(
    State(st): State<AppState>,
    Json(req): Json<UploadStatusRequest>,
) -> Result<Json<UploadStatusResponse>, AppError> {
    let status = st
        .svc
        .upload_status(&req.instance_id, &req.command_id)
        .await?;
    Ok(Json(status))
}

async fn delete_all_models(
    State(st): State<AppState>,
    Json(req): Json<DeleteAllModelsRequest>,
) -> Json<DeleteAllModelsResponse> {
    let deleted = st.svc.delete_all_models(&req.resource_ids).await;
    Json(DeleteAllModelsResponse { deleted })
}

async fn installed_models(
    State(st): State<AppState>,
    Path(instance_id): Path<String>,
) -> Json<Vec<String>> {
    Json(st.svc.installed_models(&instance_id).await)
}

#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(value: E) -> Self {
        Self(value.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<SimError>() {
            Some(SimError::UnknownCommand(_) | SimError::WrongCar { .. }) => StatusCode::NOT_FOUND,
            Some(SimError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "request rejected");
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
