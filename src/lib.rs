// lebrq-offline - Offline request router for the LebrQ client shell
// Author: kelexine (https://github.com/kelexine)

pub mod app;
pub mod cli;
pub mod config;
pub mod epoch;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod policy;
pub mod router;
pub mod server;
pub mod store;
pub mod utils;
