//! Frost-RS Library
//!
//! Coordination and persistence layer of the frost job scheduler: executor
//! discovery over a shared store, job definitions with script history, and
//! indexed execution records.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod store;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}
