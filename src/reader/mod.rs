//! Public entry point for cgroup discovery.
//!
//! [`Reader`] binds the walker matching the host's cgroup version at construction and
//! keeps a time-bounded cache of the last discovered [`crate::cgroup::Snapshot`].
mod config;
mod error;
mod facade;

pub use config::{DEFAULT_V1_BASE_CONTROLLER, ReaderConfig};
pub use error::{InitError, RefreshError, Result};
pub use facade::Reader;
