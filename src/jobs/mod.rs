//! Executor-side job bookkeeping: handler declarations, their job groups, and
//! the executor self-description built from both.

pub mod handler;
pub mod identity;
pub mod registry;

pub use handler::{ConfiguredHandler, JobHandler};
pub use identity::local_ip;
pub use registry::{JobGroupRegistry, build_groups};
