use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::cgroup::{Cgroup, Snapshot, V1Walker, V2Walker, Walker};
use crate::mounts::{self, CgroupVersion};

use super::{InitError, ReaderConfig, RefreshError, Result};

/// Discovers the cgroups of a host and serves cached snapshots of them.
///
/// The cgroup version is detected once at construction. Lookups refresh the cached
/// snapshot on demand, in the calling thread, once it is older than
/// [`ReaderConfig::cache_ttl`].
///
/// A `Reader` can be shared between threads. Snapshots are built off to the side and
/// published with an atomic swap, so readers never see a half-built snapshot and never
/// wait for a walk unless they need a fresh one themselves.
pub struct Reader {
    config: ReaderConfig,
    walker: Walker,
    published: ArcSwapOption<Snapshot>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("config", &self.config)
            .field("walker", &self.walker)
            .finish_non_exhaustive()
    }
}

impl Reader {
    /// Validates `config`, discovers the cgroup mounts and binds the matching walker.
    ///
    /// No discovery pass runs yet; the first lookup triggers it.
    ///
    /// # Errors
    ///
    /// - [`InitError::InvalidConfig`] if `config` fails validation.
    /// - [`InitError::Discovery`] if the mount table cannot be read.
    /// - [`InitError::UnknownCgroupLayout`] if no cgroup mount was found.
    /// - [`InitError::MissingBaseController`] if the v1 base controller is not mounted.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cgroup_reader::reader::{Reader, ReaderConfig};
    ///
    /// let reader = Reader::new(ReaderConfig::default()).unwrap();
    /// for cgroup in reader.list_cgroups().unwrap() {
    ///     println!("{}: {:?}", cgroup.id(), cgroup.controller_paths());
    /// }
    /// ```
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate()?;

        let proc_path = config.proc_path();
        let mounts = mounts::discover_cgroup_mounts(&config.host_prefix, &proc_path)?;

        let walker = match mounts::classify(&mounts) {
            Some(CgroupVersion::V1) => {
                let controller = config.cgroup_v1_base_controller.as_str();
                let walker = V1Walker::new(&mounts, controller).ok_or_else(|| {
                    InitError::MissingBaseController {
                        controller: controller.to_owned(),
                        mounts: mounts.clone(),
                    }
                })?;
                Walker::V1(walker)
            }
            Some(CgroupVersion::V2) => {
                let root = mounts.unified().ok_or_else(|| InitError::UnknownCgroupLayout {
                    mounts: mounts.clone(),
                })?;
                Walker::V2(V2Walker::new(root))
            }
            None => return Err(InitError::UnknownCgroupLayout { mounts }),
        };

        log::info!(
            "Detected cgroup {} from `{}`",
            walker.version(),
            proc_path.join("mounts").display()
        );

        Ok(Self {
            config,
            walker,
            published: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn version(&self) -> CgroupVersion {
        self.walker.version()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Returns all cgroups of a valid snapshot, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] if the cache had to be refreshed and the refresh failed.
    pub fn list_cgroups(&self) -> std::result::Result<Vec<Arc<Cgroup>>, RefreshError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.cgroups().cloned().collect())
    }

    /// Looks up a cgroup by identifier. `Ok(None)` means no such cgroup exists.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] if the cache had to be refreshed and the refresh failed.
    pub fn get_cgroup(
        &self,
        id: &str,
    ) -> std::result::Result<Option<Arc<Cgroup>>, RefreshError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.get(id).cloned())
    }

    /// Returns the published snapshot, refreshing it first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] if the refresh failed.
    pub fn snapshot(&self) -> std::result::Result<Arc<Snapshot>, RefreshError> {
        if let Some(snapshot) = self.valid_snapshot() {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock();
        // Another thread may have refreshed while we were waiting.
        if let Some(snapshot) = self.valid_snapshot() {
            return Ok(snapshot);
        }
        self.refresh_locked()
    }

    /// Re-runs discovery regardless of the cache and publishes the result.
    ///
    /// On failure the previously published snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] if the walk failed.
    pub fn refresh_cgroups(&self) -> std::result::Result<Arc<Snapshot>, RefreshError> {
        let _guard = self.refresh_lock.lock();
        self.refresh_locked()
    }

    /// Returns the last published snapshot without validating or refreshing it.
    pub fn cached_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published.load_full()
    }

    fn valid_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published
            .load_full()
            .filter(|snapshot| !snapshot.is_expired(self.config.cache_ttl, Instant::now()))
    }

    /// Must be called with `refresh_lock` held.
    fn refresh_locked(&self) -> std::result::Result<Arc<Snapshot>, RefreshError> {
        let cgroups = self
            .walker
            .parse_cgroups(self.config.filter.as_ref())
            .inspect_err(|err| log::warn!("Failed to refresh cgroups: {err}"))?;

        let snapshot = Arc::new(Snapshot::new(cgroups, Instant::now()));
        log::debug!("Published snapshot with {} cgroups", snapshot.len());
        self.published.store(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}
