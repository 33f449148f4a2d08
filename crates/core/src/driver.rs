//! Upload driver: one submit-or-poll action per tick.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::CommandClient;
use crate::error::CommandError;
use crate::ledger::ResultLedger;
use crate::model::{status, Car, CommandId, ModelRef};
use crate::queue::UploadQueue;

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    /// Nothing in flight; the next tick submits.
    Idle,
    /// A submit call is outstanding.
    Submitting,
    /// A command is in flight; ticks poll it.
    Polling,
    /// Queue exhausted and no command in flight. No further calls are made.
    Done,
}

/// Failure policy.
///
/// Submits are never retried: a failed submit is recorded and the driver
/// moves to the next model. Polls are retried on the following ticks until
/// `max_poll_failures` consecutive failures, then the command is abandoned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Consecutive poll failures before a command is abandoned. Values below 1 count as 1.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,
}

fn default_max_poll_failures() -> u32 {
    3
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_poll_failures: default_max_poll_failures(),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A model was dequeued and accepted by the service.
    Submitted {
        /// Model taken from the queue.
        model: ModelRef,
        /// Id assigned by the service.
        command_id: CommandId,
    },
    /// A model was dequeued but the service rejected it. Recorded under a local id.
    SubmitFailed {
        /// Model taken from the queue.
        model: ModelRef,
        /// Locally generated id the ledger row is keyed by.
        command_id: CommandId,
        /// Why the submit failed.
        error: CommandError,
    },
    /// The in-flight command was polled. `finished` when the status is terminal.
    Polled {
        /// Polled command.
        command_id: CommandId,
        /// Status reported by the service.
        status: String,
        /// The status is terminal and the command was released.
        finished: bool,
    },
    /// The poll call failed. `abandoned` once the failure budget is used up.
    PollFailed {
        /// Command whose poll failed.
        command_id: CommandId,
        /// Why the poll failed.
        error: CommandError,
        /// The failure budget is used up and the command was released.
        abandoned: bool,
    },
    /// Queue exhausted with nothing in flight; the driver is now `Done`.
    Finished,
    /// Nothing done: the driver was busy or already `Done`.
    Skipped,
}

#[derive(Debug, Clone)]
struct InFlight {
    command_id: CommandId,
    model: ModelRef,
    poll_failures: u32,
}

/// Exclusive owner of the queue, the ledger, and the in-flight command.
pub struct UploadDriver<C> {
    client: Arc<C>,
    car: Car,
    queue: UploadQueue,
    ledger: ResultLedger,
    in_flight: Option<InFlight>,
    phase: DriverPhase,
    config: DriverConfig,
}

impl<C: CommandClient> UploadDriver<C> {
    /// Idle driver for `car` with nothing recorded yet.
    pub fn new(client: Arc<C>, car: Car, queue: UploadQueue, config: DriverConfig) -> Self {
        Self {
            client,
            car,
            queue,
            ledger: ResultLedger::new(),
            in_flight: None,
            phase: DriverPhase::Idle,
            config,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Upload target.
    pub fn car(&self) -> &Car {
        &self.car
    }

    /// Remaining selection.
    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    /// Results so far.
    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    /// Command currently being polled, if any.
    pub fn in_flight(&self) -> Option<&CommandId> {
        self.in_flight.as_ref().map(|f| &f.command_id)
    }

    /// Runs one tick: poll the in-flight command, or submit the next model,
    /// or finish. Never more than one service call.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.phase == DriverPhase::Done {
            return TickOutcome::Skipped;
        }

        if self.in_flight.is_some() {
            return self.poll().await;
        }

        match self.queue.dequeue_next() {
            Ok(model) => self.submit(model).await,
            Err(_) => {
                self.phase = DriverPhase::Done;
                tracing::info!(car = %self.car.instance_id, "upload queue exhausted");
                TickOutcome::Finished
            }
        }
    }

    async fn submit(&mut self, model: ModelRef) -> TickOutcome {
        self.phase = DriverPhase::Submitting;

        match self.client.submit_upload(&self.car, &model).await {
            Ok(command_id) => {
                tracing::info!(
                    car = %self.car.instance_id,
                    model = %model.key,
                    command_id = %command_id,
                    remaining = self.queue.remaining(),
                    "upload submitted"
                );
                self.in_flight = Some(InFlight {
                    command_id: command_id.clone(),
                    model: model.clone(),
                    poll_failures: 0,
                });
                self.settle();
                TickOutcome::Submitted { model, command_id }
            }
            Err(error) => {
                let command_id = CommandId::local();
                tracing::warn!(
                    car = %self.car.instance_id,
                    model = %model.key,
                    error = %error,
                    "upload submit failed"
                );
                self.ledger.merge(&model, &command_id, status::error(&error));
                self.settle();
                TickOutcome::SubmitFailed {
                    model,
                    command_id,
                    error,
                }
            }
        }
    }

    async fn poll(&mut self) -> TickOutcome {
        let Some(mut flight) = self.in_flight.take() else {
            self.settle();
            return TickOutcome::Skipped;
        };
        self.phase = DriverPhase::Polling;

        let outcome = match self.client.upload_status(&self.car, &flight.command_id).await {
            Ok(current) => {
                flight.poll_failures = 0;
                self.ledger.merge(&flight.model, &flight.command_id, current.as_str());
                let finished = !status::is_active(&current);
                tracing::debug!(
                    command_id = %flight.command_id,
                    status = %current,
                    finished,
                    "upload status"
                );
                if finished {
                    tracing::info!(
                        command_id = %flight.command_id,
                        model = %flight.model.key,
                        status = %current,
                        "upload command finished"
                    );
                }
                TickOutcome::Polled {
                    command_id: flight.command_id.clone(),
                    status: current,
                    finished,
                }
            }
            Err(error) => {
                flight.poll_failures += 1;
                self.ledger
                    .merge(&flight.model, &flight.command_id, status::error(&error));
                let abandoned = flight.poll_failures >= self.config.max_poll_failures.max(1);
                tracing::warn!(
                    command_id = %flight.command_id,
                    failures = flight.poll_failures,
                    abandoned,
                    error = %error,
                    "upload status poll failed"
                );
                TickOutcome::PollFailed {
                    command_id: flight.command_id.clone(),
                    error,
                    abandoned,
                }
            }
        };

        let release = matches!(
            outcome,
            TickOutcome::Polled { finished: true, .. } | TickOutcome::PollFailed { abandoned: true, .. }
        );
        if !release {
            self.in_flight = Some(flight);
        }
        self.settle();
        outcome
    }

    fn settle(&mut self) {
        self.phase = if self.in_flight.is_some() {
            DriverPhase::Polling
        } else if self.queue.is_empty() {
            DriverPhase::Done
        } else {
            DriverPhase::Idle
        };
    }
}
