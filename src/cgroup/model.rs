use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::mounts::{CGROUP_V2_KEY, CgroupVersion};

use super::CgroupID;

/// One logical resource-control unit, typically a container or a systemd unit.
///
/// A `Cgroup` only knows where its directories live. Reading the stat files inside them
/// is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cgroup {
    id: CgroupID,
    version: CgroupVersion,
    controller_paths: BTreeMap<String, PathBuf>,
}

impl Cgroup {
    /// Builds a cgroup v1 entry from its per-controller directories.
    pub fn new_v1(id: CgroupID, controller_paths: BTreeMap<String, PathBuf>) -> Self {
        Self {
            id,
            version: CgroupVersion::V1,
            controller_paths,
        }
    }

    /// Builds a cgroup v2 entry whose single directory serves every controller.
    pub fn new_v2(id: CgroupID, path: PathBuf) -> Self {
        Self {
            id,
            version: CgroupVersion::V2,
            controller_paths: BTreeMap::from([(CGROUP_V2_KEY.to_owned(), path)]),
        }
    }

    pub fn id(&self) -> &CgroupID {
        &self.id
    }

    pub fn version(&self) -> CgroupVersion {
        self.version
    }

    /// All known directories, keyed by controller name (v1) or [`CGROUP_V2_KEY`] (v2).
    pub fn controller_paths(&self) -> &BTreeMap<String, PathBuf> {
        &self.controller_paths
    }

    /// Returns the directory to read `controller` files from.
    ///
    /// On v2 every controller lives in the unified directory, so any controller name
    /// resolves to it. On v1 the controller must have been found during discovery.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::path::{Path, PathBuf};
    /// # use cgroup_reader::cgroup::{Cgroup, CgroupID};
    /// let id = CgroupID::new("web").unwrap();
    /// let cgroup = Cgroup::new_v2(id, PathBuf::from("/sys/fs/cgroup/web"));
    /// assert_eq!(cgroup.controller_path("memory"), Some(Path::new("/sys/fs/cgroup/web")));
    /// ```
    pub fn controller_path(&self, controller: &str) -> Option<&Path> {
        match self.version {
            CgroupVersion::V1 => self.controller_paths.get(controller),
            CgroupVersion::V2 => self.controller_paths.get(CGROUP_V2_KEY),
        }
        .map(PathBuf::as_path)
    }
}

/// An immutable point-in-time view of all discovered cgroups.
///
/// Snapshots are never mutated after construction; a refresh publishes a new one.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    cgroups: HashMap<CgroupID, Arc<Cgroup>>,
    #[serde(skip)]
    captured_at: Instant,
}

impl Snapshot {
    pub fn new(cgroups: HashMap<CgroupID, Arc<Cgroup>>, captured_at: Instant) -> Self {
        Self {
            cgroups,
            captured_at,
        }
    }

    /// Looks up a cgroup by identifier.
    pub fn get(&self, id: &str) -> Option<&Arc<Cgroup>> {
        self.cgroups.get(id)
    }

    /// Iterates over all cgroups in no particular order.
    pub fn cgroups(&self) -> impl Iterator<Item = &Arc<Cgroup>> {
        self.cgroups.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CgroupID> {
        self.cgroups.keys()
    }

    pub fn len(&self) -> usize {
        self.cgroups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cgroups.is_empty()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Whether the snapshot is older than `ttl` at `now`. A zero `ttl` means the snapshot
    /// is always expired.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        ttl.is_zero()
            || self
                .captured_at
                .checked_add(ttl)
                .is_none_or(|valid_until| now > valid_until)
    }
}
