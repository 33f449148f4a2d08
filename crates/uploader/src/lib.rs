#![forbid(unsafe_code)]

//! Command-line host for car model upload sessions.

pub mod config;
pub mod http_client;
pub mod render;
