//! Transport seam to the car command service.

use std::future::Future;

use crate::error::CommandError;
use crate::model::{Car, CommandId, ModelRef};

/// Remote command service that dispatches work to cars.
///
/// Futures are `Send` so a session can run on a multi-threaded runtime.
pub trait CommandClient: Send + Sync + 'static {
    /// Ask the car to load `model`; returns the id of the created command.
    fn submit_upload(
        &self,
        car: &Car,
        model: &ModelRef,
    ) -> impl Future<Output = Result<CommandId, CommandError>> + Send;

    /// Current status string of a command.
    fn upload_status(
        &self,
        car: &Car,
        command_id: &CommandId,
    ) -> impl Future<Output = Result<String, CommandError>> + Send;

    /// Remove every model from the given cars. The response is not interpreted.
    fn delete_all_models(
        &self,
        car_ids: &[String],
    ) -> impl Future<Output = Result<serde_json::Value, CommandError>> + Send;
}
