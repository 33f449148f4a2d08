//! Scripted in-memory command client shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use car_upload_core::client::CommandClient;
use car_upload_core::error::CommandError;
use car_upload_core::model::{Car, CommandId, ModelRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit { car: String, key: String },
    Poll { car: String, command_id: String },
    DeleteAll { car_ids: Vec<String> },
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    next_id: u32,
    /// Status scripts keyed by model key, copied to the command on submit.
    scripts: HashMap<String, VecDeque<Result<String, CommandError>>>,
    commands: HashMap<String, VecDeque<Result<String, CommandError>>>,
    reject_submit: HashSet<String>,
    fail_delete: bool,
}

/// Fake command service. Commands report `Success` once their script runs out.
#[derive(Default)]
pub struct FakeClient {
    inner: Mutex<Inner>,
    delay: Option<Duration>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            delay: Some(delay),
        }
    }

    pub fn script(&self, key: &str, statuses: &[&str]) {
        let script = statuses.iter().map(|s| Ok(s.to_string())).collect();
        self.inner.lock().unwrap().scripts.insert(key.to_string(), script);
    }

    pub fn script_results(&self, key: &str, results: Vec<Result<String, CommandError>>) {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .insert(key.to_string(), results.into());
    }

    pub fn reject_submit(&self, key: &str) {
        self.inner.lock().unwrap().reject_submit.insert(key.to_string());
    }

    pub fn fail_delete(&self) {
        self.inner.lock().unwrap().fail_delete = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn submits(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Submit { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }
}

impl CommandClient for FakeClient {
    async fn submit_upload(&self, car: &Car, model: &ModelRef) -> Result<CommandId, CommandError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Submit {
            car: car.instance_id.clone(),
            key: model.key.clone(),
        });
        if inner.reject_submit.contains(&model.key) {
            return Err(CommandError::SubmitFailed("car offline".into()));
        }
        inner.next_id += 1;
        let id = format!("cmd-{}", inner.next_id);
        let script = inner.scripts.get(&model.key).cloned().unwrap_or_default();
        inner.commands.insert(id.clone(), script);
        Ok(CommandId::new(id))
    }

    async fn upload_status(&self, car: &Car, command_id: &CommandId) -> Result<String, CommandError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Poll {
            car: car.instance_id.clone(),
            command_id: command_id.to_string(),
        });
        inner
            .commands
            .get_mut(command_id.as_str())
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| Ok("Success".to_string()))
    }

    async fn delete_all_models(&self, car_ids: &[String]) -> Result<serde_json::Value, CommandError> {
        self.pause().await;
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::DeleteAll {
            car_ids: car_ids.to_vec(),
        });
        if inner.fail_delete {
            return Err(CommandError::DeleteFailed("service unavailable".into()));
        }
        Ok(serde_json::json!({ "deleted": car_ids }))
    }
}

pub fn models(keys: &[&str]) -> Vec<ModelRef> {
    keys.iter().map(|k| ModelRef::new(*k)).collect()
}
