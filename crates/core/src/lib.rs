#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Car model upload orchestration: queue, result ledger, polling driver, and
//! the session loop that hosts them.

pub mod api;
pub mod client;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod model;
pub mod queue;
pub mod session;

mod util;

pub use util::{new_ulid, now_ms};
