use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid cgroup id: {0:?}")]
    InvalidCgroupID(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a whole discovery pass.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to list cgroup hierarchy root `{path}`: {source}")]
    ReadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
