use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use car_upload_core::driver::DriverConfig;
use car_upload_core::model::{Car, ModelRef};
use car_upload_core::queue::QueueOrder;
use car_upload_core::session::{SessionConfig, SessionPlan};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_INTERVAL_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Parser, Debug, Clone)]
#[command(name = "car-uploader", version, about = "Upload models to a car and follow the commands")]
pub struct Cli {
    /// Command service base URL, e.g. http://127.0.0.1:3000
    #[arg(long)]
    pub service_url: Option<String>,

    /// Target car instance id. Repeat to pre-clear several cars; uploads go to the first.
    #[arg(long = "car")]
    pub cars: Vec<String>,

    /// Model storage key to upload. Repeatable.
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Delete all models on the selected cars before uploading.
    #[arg(long)]
    pub clear_first: bool,

    /// Skip the confirmation before clearing models.
    #[arg(long)]
    pub yes: bool,

    /// Tick interval in milliseconds.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Order in which selected models are taken.
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Consecutive poll failures before a command is given up.
    #[arg(long)]
    pub max_poll_failures: Option<u32>,

    /// Optional TOML config file; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (env-filter syntax).
    #[arg(long, default_value = "info")]
    pub log: String,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OrderArg {
    Lifo,
    Fifo,
}

impl From<OrderArg> for QueueOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Lifo => QueueOrder::Lifo,
            OrderArg::Fifo => QueueOrder::Fifo,
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UploaderConfig {
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub order: Option<QueueOrder>,
    #[serde(default)]
    pub max_poll_failures: Option<u32>,
    #[serde(default)]
    pub clear_first: Option<bool>,
    #[serde(default)]
    pub cars: Vec<CarEntry>,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarEntry {
    pub instance_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl UploaderConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: UploaderConfig =
            toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }
}

/// Effective settings after merging the config file and flags.
#[derive(Clone, Debug)]
pub struct Settings {
    pub service_url: String,
    pub tick_interval: Duration,
    pub request_timeout: Duration,
    pub order: QueueOrder,
    pub max_poll_failures: u32,
    pub clear_first: bool,
    pub cars: Vec<Car>,
    pub models: Vec<ModelRef>,
}

impl Settings {
    /// Reads `cli.config` when given, then applies the flags on top.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => UploaderConfig::load_from(path)?,
            None => UploaderConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    pub fn merge(cli: &Cli, file: UploaderConfig) -> Self {
        let cars = if cli.cars.is_empty() {
            file.cars
                .into_iter()
                .map(|c| Car {
                    instance_id: c.instance_id,
                    computer_name: c.name,
                })
                .collect()
        } else {
            cli.cars.iter().map(Car::new).collect()
        };
        let models = if cli.models.is_empty() {
            file.models
        } else {
            cli.models.clone()
        };

        Self {
            service_url: cli
                .service_url
                .clone()
                .or(file.service_url)
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            tick_interval: Duration::from_millis(
                cli.interval_ms.or(file.interval_ms).unwrap_or(DEFAULT_INTERVAL_MS),
            ),
            request_timeout: Duration::from_millis(
                file.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            ),
            order: cli.order.map(QueueOrder::from).or(file.order).unwrap_or_default(),
            max_poll_failures: cli
                .max_poll_failures
                .or(file.max_poll_failures)
                .unwrap_or_else(|| DriverConfig::default().max_poll_failures),
            clear_first: cli.clear_first || file.clear_first.unwrap_or(false),
            cars,
            models: models.into_iter().map(ModelRef::new).collect(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: self.tick_interval,
            driver: DriverConfig {
                max_poll_failures: self.max_poll_failures,
            },
        }
    }

    pub fn plan(&self) -> SessionPlan {
        SessionPlan {
            cars: self.cars.clone(),
            models: self.models.clone(),
            clear_first: self.clear_first,
            order: self.order,
        }
    }
}
