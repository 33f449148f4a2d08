//! Per-session results table.

use crate::model::{CommandId, ModelRef, ResultRecord};

/// Per-session results, one record per command id in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLedger {
    records: Vec<ResultRecord>,
}

impl ResultLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the newest status for `command_id`.
    ///
    /// An existing record for the id is replaced in place; otherwise the record
    /// is appended.
    pub fn merge(&mut self, model: &ModelRef, command_id: &CommandId, status: impl Into<String>) {
        let record = ResultRecord {
            model_name: model.display_name(),
            command_id: command_id.clone(),
            status: status.into(),
        };

        match self
            .records
            .iter_mut()
            .find(|r| r.command_id == *command_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Record for a command, if seen.
    pub fn get(&self, command_id: &CommandId) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.command_id == *command_id)
    }

    /// All records in first-seen order.
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
