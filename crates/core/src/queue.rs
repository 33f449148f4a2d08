//! Upload backlog.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::model::ModelRef;

/// Which end of the pending list the queue takes from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    /// Take the most recently selected model first.
    #[default]
    Lifo,
    /// Take models in selection order.
    Fifo,
}

/// Backlog of models still to be sent to the target car.
///
/// Built once from the selection snapshot; it only ever shrinks.
#[derive(Debug, Clone)]
pub struct UploadQueue {
    pending: VecDeque<ModelRef>,
    total: usize,
    order: QueueOrder,
}

impl UploadQueue {
    /// Snapshot of the selection, taken in `order`.
    pub fn new(models: impl IntoIterator<Item = ModelRef>, order: QueueOrder) -> Self {
        let pending: VecDeque<ModelRef> = models.into_iter().collect();
        let total = pending.len();
        Self {
            pending,
            total,
            order,
        }
    }

    /// Models not sent yet.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Size of the initial selection.
    pub fn total(&self) -> usize {
        self.total
    }

    /// True once every model has been taken.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns the next model.
    pub fn dequeue_next(&mut self) -> Result<ModelRef, QueueError> {
        let next = match self.order {
            QueueOrder::Lifo => self.pending.pop_back(),
            QueueOrder::Fifo => self.pending.pop_front(),
        };
        next.ok_or(QueueError::EmptyQueue)
    }

    /// Share of the selection already taken from the queue, 0..=100.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.total, self.remaining())
    }
}

pub(crate) fn progress_percent(total: usize, remaining: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (total - remaining.min(total)) as f64 / total as f64 * 100.0
}
