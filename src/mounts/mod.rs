//! Cgroup mount discovery.
//!
//! Reads the mount table to locate cgroup hierarchies and decides whether the host runs
//! cgroup v1 or v2.
mod classify;
mod error;
mod parser;
mod scan;

pub use classify::{CgroupVersion, classify};
pub use error::{Error, Result};
pub use parser::{MountEntry, MountField, ParseError, parse_mount_line};
pub use scan::{CGROUP_V2_KEY, CgroupMounts, MountPoint, discover_cgroup_mounts};
