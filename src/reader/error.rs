use crate::mounts::{self, CgroupMounts};

pub use crate::cgroup::RefreshError;

/// Errors that prevent a [`super::Reader`] from being constructed.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to discover cgroup mount points: {0}")]
    Discovery(#[from] mounts::Error),
    #[error("unable to detect cgroup version from detected mount points: {mounts}")]
    UnknownCgroupLayout { mounts: CgroupMounts },
    #[error("cgroup v1 base controller `{controller}` is not mounted, found: {mounts}")]
    MissingBaseController {
        controller: String,
        mounts: CgroupMounts,
    },
    #[error("invalid reader configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, InitError>;
