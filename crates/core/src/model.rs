//! Domain types: models, cars, command ids and statuses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A trained model artifact, identified by its storage key.
///
/// Keys look like `<user>/models/<model_name>/<file>`; the key is opaque to the
/// driver apart from [`ModelRef::display_name`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModelRef {
    /// Storage key.
    pub key: String,
}

impl ModelRef {
    /// Wraps a storage key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Name shown in the results table, `"{owner}-{file}"`.
    ///
    /// A `models` folder directly before the file is skipped, then the last
    /// two segments are joined: `user/models/file` gives `user-file` and
    /// `alice/models/race1/model-final` gives `race1-model-final`. A key with a
    /// single segment yields just that segment.
    pub fn display_name(&self) -> String {
        let mut pieces: Vec<&str> = self.key.split('/').collect();
        let len = pieces.len();
        if len >= 3 && pieces[len - 2] == MODELS_FOLDER {
            pieces.remove(len - 2);
        }
        match pieces.as_slice() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [.., owner, file] => format!("{owner}-{file}"),
        }
    }
}

const MODELS_FOLDER: &str = "models";

/// A physical car that models can be uploaded to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Car {
    /// Managed instance id of the car.
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    /// Host name shown to operators.
    #[serde(rename = "ComputerName", default)]
    pub computer_name: Option<String>,
}

impl Car {
    /// Car with only an instance id.
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            computer_name: None,
        }
    }

    /// Name for logs and tables, falling back to the instance id.
    pub fn label(&self) -> &str {
        self.computer_name.as_deref().unwrap_or(&self.instance_id)
    }
}

/// Opaque identifier of a command dispatched to a car.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl CommandId {
    /// Wraps a raw id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a command that never reached the service (failed submit).
    pub fn local() -> Self {
        Self(format!("local-{}", crate::new_ulid()))
    }

    /// True for ids produced by [`CommandId::local`].
    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    /// Raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status strings reported by the command service.
pub mod status {
    /// Accepted, not yet running.
    pub const PENDING: &str = "Pending";
    /// Running on the car.
    pub const IN_PROGRESS: &str = "InProgress";
    /// Delivery to the car delayed.
    pub const DELAYED: &str = "Delayed";
    /// Cancel requested, not yet applied.
    pub const CANCELLING: &str = "Cancelling";
    /// Finished successfully.
    pub const SUCCESS: &str = "Success";
    /// Finished with an error on the car.
    pub const FAILED: &str = "Failed";
    /// Cancelled.
    pub const CANCELLED: &str = "Cancelled";
    /// Did not finish in time.
    pub const TIMED_OUT: &str = "TimedOut";

    /// Prefix of statuses produced locally when a call to the service fails.
    pub const ERROR_PREFIX: &str = "Error: ";

    /// Whether the command is still being worked on by the service.
    ///
    /// Anything that is not a known active status counts as terminal, so an
    /// unexpected value never pins the driver to one command.
    pub fn is_active(status: &str) -> bool {
        matches!(status, PENDING | IN_PROGRESS | DELAYED | CANCELLING)
    }

    /// Whether the status was produced locally from a failed call.
    pub fn is_error(status: &str) -> bool {
        status.starts_with(ERROR_PREFIX)
    }

    /// Formats a local error status.
    pub fn error(msg: impl std::fmt::Display) -> String {
        format!("{ERROR_PREFIX}{msg}")
    }
}

/// Latest known result of one upload command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRecord {
    /// Display name of the uploaded model.
    #[serde(rename = "ModelName")]
    pub model_name: String,
    /// Command the record tracks.
    #[serde(rename = "CommandId")]
    pub command_id: CommandId,
    /// Latest status string.
    #[serde(rename = "Status")]
    pub status: String,
}
