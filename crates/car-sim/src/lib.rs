#![forbid(unsafe_code)]

//! In-memory car command service: accepts model uploads, reports command
//! status, and clears models, so the uploader can run without real cars.

pub mod http;
pub mod service;

pub use service::{CarSimService, SimConfig, SimError};
