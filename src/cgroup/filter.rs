use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Error a filter may return for a single directory. It is logged and the directory is
/// skipped; discovery of other directories continues.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

/// `Ok(None)` (or an empty identifier) excludes the directory, `Ok(Some(id))` includes
/// it under `id`.
pub type FilterResult = Result<Option<String>, FilterError>;

/// Selects interesting cgroup directories and names them.
///
/// Implemented for any `Fn(&Path, &str) -> FilterResult`, so closures can be used
/// directly:
///
/// ```
/// # use std::path::Path;
/// # use cgroup_reader::cgroup::{FilterResult, ReaderFilter};
/// let only_slices = |_: &Path, name: &str| -> FilterResult {
///     Ok(name.ends_with(".slice").then(|| name.to_owned()))
/// };
/// let id = only_slices.identify(Path::new("/sys/fs/cgroup/user.slice"), "user.slice");
/// assert_eq!(id.unwrap().as_deref(), Some("user.slice"));
/// ```
pub trait ReaderFilter: Send + Sync {
    /// Decides whether the directory at `path`, whose file name is `name`, is a cgroup
    /// and returns its identifier.
    fn identify(&self, path: &Path, name: &str) -> FilterResult;
}

impl<F> ReaderFilter for F
where
    F: Fn(&Path, &str) -> FilterResult + Send + Sync,
{
    fn identify(&self, path: &Path, name: &str) -> FilterResult {
        self(path, name)
    }
}

/// Accepts every directory, using its folder name as identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFilter;

impl ReaderFilter for DefaultFilter {
    fn identify(&self, _path: &Path, name: &str) -> FilterResult {
        Ok(Some(name.to_owned()))
    }
}

/// Matches a 64 character hex id or a `8-4-4-4-12` UUID.
static CONTAINER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{64}|[0-9a-f]{8}(?:-[0-9a-f]{4}){3}-[0-9a-f]{12}")
        .expect("container id pattern is valid")
});

/// Accepts directories whose name embeds a container id, using the id as identifier.
///
/// `.mount` cgroups are excluded: the systemd cgroup driver may create one next to the
/// container's scope and it carries the same id but no processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerFilter;

impl ReaderFilter for ContainerFilter {
    fn identify(&self, _path: &Path, name: &str) -> FilterResult {
        if name.ends_with(".mount") {
            return Ok(None);
        }
        Ok(CONTAINER_ID.find(name).map(|m| m.as_str().to_owned()))
    }
}
