use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cgroup::{ContainerFilter, DefaultFilter, ReaderFilter};
use crate::fsutil;

use super::{InitError, Result};

/// Controller walked on cgroup v1 hosts unless configured otherwise.
pub const DEFAULT_V1_BASE_CONTROLLER: &str = "memory";

const ENV_HOST_PREFIX: &str = "CGROUP_READER_HOST_PREFIX";
const ENV_PROC_PATH: &str = "CGROUP_READER_PROC_PATH";
const ENV_BASE_CONTROLLER: &str = "CGROUP_READER_BASE_CONTROLLER";
const ENV_CACHE_TTL: &str = "CGROUP_READER_CACHE_TTL";
const ENV_FILTER: &str = "CGROUP_READER_FILTER";

/// Configuration of a [`super::Reader`]. Immutable once the reader is built.
#[derive(Clone)]
pub struct ReaderConfig {
    /// Where the host filesystem is mounted when not running on the host, e.g. `/host`.
    /// Empty when running on the host.
    pub host_prefix: PathBuf,
    /// Where `/proc` is mounted. The host prefix is not applied to it.
    /// Defaults to `host_prefix/proc`.
    pub proc_path: Option<PathBuf>,
    /// Controller whose hierarchy is walked on cgroup v1 hosts. Other controllers are
    /// assumed to use the same relative paths.
    pub cgroup_v1_base_controller: String,
    /// Selects cgroup directories and assigns their identifiers.
    pub filter: Arc<dyn ReaderFilter>,
    /// How long discovered cgroup paths stay valid. Zero disables caching.
    ///
    /// Only paths are cached, never the statistics read from them.
    pub cache_ttl: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            host_prefix: PathBuf::new(),
            proc_path: None,
            cgroup_v1_base_controller: DEFAULT_V1_BASE_CONTROLLER.to_owned(),
            filter: Arc::new(DefaultFilter),
            cache_ttl: Duration::ZERO,
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("host_prefix", &self.host_prefix)
            .field("proc_path", &self.proc_path)
            .field("cgroup_v1_base_controller", &self.cgroup_v1_base_controller)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl ReaderConfig {
    /// Returns the effective `/proc` location.
    pub fn proc_path(&self) -> PathBuf {
        self.proc_path
            .clone()
            .unwrap_or_else(|| fsutil::host_path(&self.host_prefix, Path::new("/proc")))
    }

    /// Checks the configuration for values no reader can work with.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::InvalidConfig`] if the base controller is empty or is not a
    /// single controller name.
    pub fn validate(&self) -> Result<()> {
        let controller = &self.cgroup_v1_base_controller;
        if controller.is_empty() {
            return Err(InitError::InvalidConfig(
                "cgroup v1 base controller must not be empty".to_owned(),
            ));
        }
        if controller.contains(['/', ',']) || controller.contains(char::is_whitespace) {
            return Err(InitError::InvalidConfig(format!(
                "cgroup v1 base controller `{controller}` must be a single controller name"
            )));
        }
        Ok(())
    }

    /// Builds a configuration from `CGROUP_READER_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CGROUP_READER_HOST_PREFIX` | [`host_prefix`](Self::host_prefix) |
    /// | `CGROUP_READER_PROC_PATH` | [`proc_path`](Self::proc_path) |
    /// | `CGROUP_READER_BASE_CONTROLLER` | [`cgroup_v1_base_controller`](Self::cgroup_v1_base_controller) |
    /// | `CGROUP_READER_CACHE_TTL` | [`cache_ttl`](Self::cache_ttl), e.g. `5s` or `1m 30s` |
    /// | `CGROUP_READER_FILTER` | [`filter`](Self::filter), `all` or `container` |
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::InvalidConfig`] if a variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(prefix) = lookup(ENV_HOST_PREFIX) {
            config.host_prefix = PathBuf::from(prefix);
        }
        if let Some(proc_path) = lookup(ENV_PROC_PATH) {
            config.proc_path = Some(PathBuf::from(proc_path));
        }
        if let Some(controller) = lookup(ENV_BASE_CONTROLLER) {
            config.cgroup_v1_base_controller = controller;
        }
        if let Some(ttl) = lookup(ENV_CACHE_TTL) {
            config.cache_ttl = humantime::parse_duration(ttl.trim()).map_err(|err| {
                InitError::InvalidConfig(format!("invalid {ENV_CACHE_TTL} `{ttl}`: {err}"))
            })?;
        }
        if let Some(filter) = lookup(ENV_FILTER) {
            config.filter = parse_filter(&filter)?;
        }

        Ok(config)
    }
}

fn parse_filter(name: &str) -> Result<Arc<dyn ReaderFilter>> {
    match name.trim() {
        "all" | "default" => Ok(Arc::new(DefaultFilter)),
        "container" => Ok(Arc::new(ContainerFilter)),
        other => Err(InitError::InvalidConfig(format!(
            "unknown {ENV_FILTER} `{other}`, expected `all` or `container`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<ReaderConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ReaderConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.proc_path(), PathBuf::from("/proc"));
        assert_eq!(config.cgroup_v1_base_controller, "memory");
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_proc_path_follows_host_prefix() {
        let config = ReaderConfig {
            host_prefix: PathBuf::from("/host"),
            ..Default::default()
        };
        assert_eq!(config.proc_path(), PathBuf::from("/host/proc"));

        let config = ReaderConfig {
            host_prefix: PathBuf::from("/host"),
            proc_path: Some(PathBuf::from("/proc")),
            ..Default::default()
        };
        assert_eq!(config.proc_path(), PathBuf::from("/proc"));
    }

    #[test]
    fn test_validate_rejects_bad_base_controller() {
        for controller in ["", "cpu,cpuacct", "memory/docker", "mem ory"] {
            let config = ReaderConfig {
                cgroup_v1_base_controller: controller.to_owned(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(InitError::InvalidConfig(_))),
                "controller `{controller}` should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_relative_host_prefix() {
        let config = ReaderConfig {
            host_prefix: PathBuf::from("host"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.proc_path(), PathBuf::from("host/proc"));
    }

    #[test]
    fn test_from_lookup() {
        let config = from_vars(&[
            (ENV_HOST_PREFIX, "/host"),
            (ENV_BASE_CONTROLLER, "pids"),
            (ENV_CACHE_TTL, "5s"),
            (ENV_FILTER, "container"),
        ])
        .unwrap();

        assert_eq!(config.host_prefix, PathBuf::from("/host"));
        assert_eq!(config.proc_path(), PathBuf::from("/host/proc"));
        assert_eq!(config.cgroup_v1_base_controller, "pids");
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_empty_keeps_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.cgroup_v1_base_controller, DEFAULT_V1_BASE_CONTROLLER);
        assert!(config.proc_path.is_none());
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        assert!(matches!(
            from_vars(&[(ENV_CACHE_TTL, "soon")]),
            Err(InitError::InvalidConfig(_))
        ));
        assert!(matches!(
            from_vars(&[(ENV_FILTER, "pods")]),
            Err(InitError::InvalidConfig(_))
        ));
    }
}
