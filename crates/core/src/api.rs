//! Wire shapes of the car command service.

use serde::{Deserialize, Serialize};

use crate::model::CommandId;

/// Upload path on the command service.
pub const UPLOAD_PATH: &str = "/cars/upload";
/// Upload status path on the command service.
pub const UPLOAD_STATUS_PATH: &str = "/cars/upload/status";
/// Bulk model removal path on the command service.
pub const DELETE_ALL_MODELS_PATH: &str = "/cars/delete_all_models";

/// Upload a model to a car. The response body is the bare command id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadRequest {
    /// Target car.
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    /// Model storage key.
    pub key: String,
}

/// Upload response: the command id as a JSON string.
pub type UploadResponse = CommandId;

/// Poll the status of an upload command. The response body is the bare status string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadStatusRequest {
    /// Car the command was sent to.
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    /// Command to report on.
    #[serde(rename = "CommandId")]
    pub command_id: CommandId,
}

/// Upload status response: the status as a JSON string.
pub type UploadStatusResponse = String;

/// Remove every model from the given cars.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteAllModelsRequest {
    /// Car instance ids.
    #[serde(rename = "resourceIds")]
    pub resource_ids: Vec<String>,
}

/// Error body returned by the command service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}
