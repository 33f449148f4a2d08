use std::collections::{BTreeMap, HashMap};

use car_upload_core::model::{status, CommandId};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Model keys with this suffix fail on the car.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Simulation knobs.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Polls answered with `InProgress` after the first `Pending` one.
    pub in_progress_polls: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            in_progress_polls: 3,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("command {command_id} does not belong to {instance_id}")]
    WrongCar {
        command_id: String,
        instance_id: String,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug)]
struct SimCommand {
    instance_id: String,
    key: String,
    polls: u32,
    status: &'static str,
}

#[derive(Default)]
struct Inner {
    commands: HashMap<String, SimCommand>,
    /// Installed model keys per car.
    cars: BTreeMap<String, Vec<String>>,
}

/// Simulated fleet of cars behind the command service API.
pub struct CarSimService {
    cfg: SimConfig,
    inner: Mutex<Inner>,
}

impl CarSimService {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Creates an upload command for `key` on `instance_id`.
    pub async fn upload(&self, instance_id: &str, key: &str) -> Result<CommandId, SimError> {
        if instance_id.is_empty() {
            return Err(SimError::BadRequest("InstanceId is required".into()));
        }
        if key.is_empty() {
            return Err(SimError::BadRequest("key is required".into()));
        }

        let command_id = Uuid::new_v4().to_string();
        let mut inner = self.inner.lock().await;
        inner.commands.insert(
            command_id.clone(),
            SimCommand {
                instance_id: instance_id.to_string(),
                key: key.to_string(),
                polls: 0,
                status: status::PENDING,
            },
        );
        inner.cars.entry(instance_id.to_string()).or_default();

        tracing::info!(instance_id, key, command_id = %command_id, "upload accepted");
        Ok(CommandId::new(command_id))
    }

    /// Reports the status of a command and advances it one step.
    ///
    /// The first poll answers `Pending`, the next `in_progress_polls` answer
    /// `InProgress`, and every later poll answers the terminal status.
    pub async fn upload_status(&self, instance_id: &str, command_id: &CommandId) -> Result<String, SimError> {
        let mut inner = self.inner.lock().await;
        let Inner { commands, cars } = &mut *inner;

        let cmd = commands
            .get_mut(command_id.as_str())
            .ok_or_else(|| SimError::UnknownCommand(command_id.to_string()))?;
        if cmd.instance_id != instance_id {
            return Err(SimError::WrongCar {
                command_id: command_id.to_string(),
                instance_id: instance_id.to_string(),
            });
        }

        let reported = cmd.status;
        cmd.polls += 1;
        if status::is_active(cmd.status) && cmd.polls > self.cfg.in_progress_polls {
            cmd.status = if cmd.key.ends_with(CORRUPT_SUFFIX) {
                status::FAILED
            } else {
                status::SUCCESS
            };
            if cmd.status == status::SUCCESS {
                let installed = cars.entry(cmd.instance_id.clone()).or_default();
                if !installed.contains(&cmd.key) {
                    installed.push(cmd.key.clone());
                }
            }
            tracing::info!(command_id = %command_id, status = cmd.status, "command finished");
        } else if status::is_active(cmd.status) {
            cmd.status = status::IN_PROGRESS;
        }

        Ok(reported.to_string())
    }

    /// Removes every installed model from the given cars. Returns the cleared ids.
    pub async fn delete_all_models(&self, resource_ids: &[String]) -> Vec<String> {
        let mut inner = self.inner.lock().await;
        let mut deleted = Vec::with_capacity(resource_ids.len());
        for id in resource_ids {
            let removed = inner.cars.insert(id.clone(), Vec::new()).unwrap_or_default();
            tracing::info!(instance_id = %id, removed = removed.len(), "models deleted");
            deleted.push(id.clone());
        }
        deleted
    }

    /// Model keys installed on a car.
    pub async fn installed_models(&self, instance_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .await
            .cars
            .get(instance_id)
            .cloned()
            .unwrap_or_default()
    }
}
