use std::time::Duration;

use anyhow::Context;
use car_upload_core::api::{
    DeleteAllModelsRequest, ErrorResponse, UploadRequest, UploadResponse, UploadStatusRequest,
    UploadStatusResponse, DELETE_ALL_MODELS_PATH, UPLOAD_PATH, UPLOAD_STATUS_PATH,
};
use car_upload_core::client::CommandClient;
use car_upload_core::error::CommandError;
use car_upload_core::model::{Car, CommandId, ModelRef};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

/// [`CommandClient`] over the command service's JSON API.
#[derive(Clone)]
pub struct HttpCommandClient {
    client: Client,
    base_url: String,
}

impl HttpCommandClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, String>
    where
        Req: Serialize + Sync + ?Sized,
        Resp: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = match resp.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => "no error body".to_string(),
            };
            return Err(format!("{url}: {status}: {detail}"));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| format!("{url}: decode: {e}"))
    }
}

impl CommandClient for HttpCommandClient {
    async fn submit_upload(&self, car: &Car, model: &ModelRef) -> Result<CommandId, CommandError> {
        let req = UploadRequest {
            instance_id: car.instance_id.clone(),
            key: model.key.clone(),
        };
        self.post_json::<_, UploadResponse>(UPLOAD_PATH, &req)
            .await
            .map_err(CommandError::SubmitFailed)
    }

    async fn upload_status(&self, car: &Car, command_id: &CommandId) -> Result<String, CommandError> {
        let req = UploadStatusRequest {
            instance_id: car.instance_id.clone(),
            command_id: command_id.clone(),
        };
        self.post_json::<_, UploadStatusResponse>(UPLOAD_STATUS_PATH, &req)
            .await
            .map_err(CommandError::PollFailed)
    }

    async fn delete_all_models(&self, car_ids: &[String]) -> Result<serde_json::Value, CommandError> {
        let req = DeleteAllModelsRequest {
            resource_ids: car_ids.to_vec(),
        };
        self.post_json::<_, serde_json::Value>(DELETE_ALL_MODELS_PATH, &req)
            .await
            .map_err(CommandError::DeleteFailed)
    }
}
