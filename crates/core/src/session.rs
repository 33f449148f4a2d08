//! Upload session: optional pre-clear, then a fixed-cadence tick loop around
//! an [`UploadDriver`], publishing snapshots for the presentation layer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use ulid::Ulid;

use crate::client::CommandClient;
use crate::driver::{DriverConfig, DriverPhase, TickOutcome, UploadDriver};
use crate::error::SessionError;
use crate::model::{Car, ModelRef, ResultRecord};
use crate::queue::{progress_percent, QueueOrder, UploadQueue};
use crate::{new_ulid, now_ms};

/// Default tick cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// What the operator selected.
#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    /// Selected cars. Uploads go to the first one; the pre-clear covers all of them.
    pub cars: Vec<Car>,
    /// Models to upload, in selection order.
    pub models: Vec<ModelRef>,
    /// Remove all models from the selected cars before uploading.
    pub clear_first: bool,
    /// Consumption order of `models`.
    pub order: QueueOrder,
}

/// Session tuning.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Time between ticks. Must be non-zero.
    pub tick_interval: Duration,
    /// Poll failure policy.
    pub driver: DriverConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            driver: DriverConfig::default(),
        }
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    /// Session ULID.
    pub session_id: String,
    /// Upload target.
    pub car: Car,
    /// Driver phase after the latest tick.
    pub phase: DriverPhase,
    /// Models not sent yet.
    pub remaining: usize,
    /// Size of the selection.
    pub total: usize,
    /// Ledger contents in first-seen order.
    pub records: Vec<ResultRecord>,
    /// Set when the session was stopped before finishing.
    pub cancelled: bool,
    /// Epoch milliseconds when the snapshot was taken.
    pub updated_at_ms: i64,
}

impl SessionSnapshot {
    /// Share of the selection already taken from the queue, 0..=100.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.total, self.remaining)
    }

    /// True once the session will make no further calls.
    pub fn is_finished(&self) -> bool {
        self.cancelled || self.phase == DriverPhase::Done
    }
}

/// One upload run against a single target car.
pub struct UploadSession<C> {
    id: Ulid,
    client: Arc<C>,
    clear_car_ids: Vec<String>,
    clear_first: bool,
    tick_interval: Duration,
    driver: Mutex<UploadDriver<C>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<C: CommandClient> UploadSession<C> {
    /// Validates the plan and builds the driver. Nothing runs until [`UploadSession::start`].
    pub fn new(client: Arc<C>, plan: SessionPlan, config: SessionConfig) -> Result<Self, SessionError> {
        if config.tick_interval.is_zero() {
            return Err(SessionError::ZeroInterval);
        }
        let car = plan.cars.first().cloned().ok_or(SessionError::NoTargetCar)?;
        let clear_car_ids = plan.cars.iter().map(|c| c.instance_id.clone()).collect();

        let id = new_ulid();
        let queue = UploadQueue::new(plan.models, plan.order);
        let driver = UploadDriver::new(Arc::clone(&client), car, queue, config.driver);
        let (snapshot_tx, _) = watch::channel(snapshot_of(id, &driver, false));

        Ok(Self {
            id,
            client,
            clear_car_ids,
            clear_first: plan.clear_first,
            tick_interval: config.tick_interval,
            driver: Mutex::new(driver),
            snapshot_tx,
        })
    }

    /// Session id, also attached to the session's tracing span.
    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Subscribes to snapshot updates.
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Issues the bulk model removal for every selected car, if requested.
    ///
    /// The outcome is logged only; uploading proceeds either way.
    pub async fn pre_clear(&self) {
        if !self.clear_first {
            return;
        }
        match self.client.delete_all_models(&self.clear_car_ids).await {
            Ok(resp) => {
                tracing::info!(cars = ?self.clear_car_ids, response = %resp, "cleared models on cars")
            }
            Err(e) => {
                tracing::warn!(cars = ?self.clear_car_ids, error = %e, "model pre-clear failed; uploading anyway")
            }
        }
    }

    /// Runs one driver tick unless a previous tick is still in progress.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut driver) = self.driver.try_lock() else {
            tracing::debug!("tick skipped: driver busy");
            return TickOutcome::Skipped;
        };
        let outcome = driver.tick().await;
        self.snapshot_tx
            .send_replace(snapshot_of(self.id, &driver, false));
        outcome
    }

    /// Spawns the session onto the tokio runtime.
    pub fn start(self) -> SessionHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let snapshots = self.snapshots();
        let span = tracing::info_span!("upload_session", session_id = %self.id);
        let join = tokio::spawn(self.run(cancel_rx).instrument(span));
        SessionHandle {
            cancel: cancel_tx,
            snapshots,
            join,
        }
    }

    async fn run(self, mut cancel: watch::Receiver<bool>) -> SessionSnapshot {
        self.pre_clear().await;

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *cancel.borrow() {
                return self.cancelled().await;
            }
            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    // A dropped handle counts as a cancel.
                    if changed.is_err() || *cancel.borrow() {
                        return self.cancelled().await;
                    }
                    continue;
                }
                _ = interval.tick() => {}
            }

            self.tick().await;
            if self.snapshot().phase == DriverPhase::Done {
                tracing::info!(records = self.snapshot().records.len(), "upload session finished");
                return self.snapshot();
            }
        }
    }

    async fn cancelled(&self) -> SessionSnapshot {
        let driver = self.driver.lock().await;
        let snapshot = snapshot_of(self.id, &driver, true);
        self.snapshot_tx.send_replace(snapshot.clone());
        tracing::info!(
            remaining = snapshot.remaining,
            records = snapshot.records.len(),
            "upload session cancelled"
        );
        snapshot
    }
}

fn snapshot_of<C: CommandClient>(id: Ulid, driver: &UploadDriver<C>, cancelled: bool) -> SessionSnapshot {
    SessionSnapshot {
        session_id: id.to_string(),
        car: driver.car().clone(),
        phase: driver.phase(),
        remaining: driver.queue().remaining(),
        total: driver.queue().total(),
        records: driver.ledger().records().to_vec(),
        cancelled,
        updated_at_ms: now_ms(),
    }
}

/// Host-side handle of a running session.
pub struct SessionHandle {
    cancel: watch::Sender<bool>,
    snapshots: watch::Receiver<SessionSnapshot>,
    join: JoinHandle<SessionSnapshot>,
}

impl SessionHandle {
    /// Stops the timer. A tick already in progress completes; nothing after it runs.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Receiver for snapshot updates.
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for the loop to end and returns the final snapshot.
    pub async fn wait(mut self) -> SessionSnapshot {
        match (&mut self.join).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "upload session task failed");
                let last = self.snapshots.borrow().clone();
                last
            }
        }
    }
}
