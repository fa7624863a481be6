use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::fsutil;

use super::parser::{MountEntry, parse_mount_line};
use super::{Error, Result};

/// Reserved key under which the cgroup v2 unified mount is recorded.
pub const CGROUP_V2_KEY: &str = "cgroupv2";

/// Filesystem type of cgroup v1 hierarchies.
const CGROUP_V1_FS_TYPE: &str = "cgroup";
/// Filesystem type of the cgroup v2 unified hierarchy.
const CGROUP_V2_FS_TYPE: &str = "cgroup2";

/// Controllers that may appear as mount options of a cgroup v1 hierarchy.
const CGROUP_V1_CONTROLLERS: &[&str] = &[
    "blkio",
    "cpu",
    "cpuacct",
    "cpuset",
    "devices",
    "freezer",
    "hugetlb",
    "memory",
    "misc",
    "net_cls",
    "net_prio",
    "perf_event",
    "pids",
    "rdma",
];

/// A single controller (or the unified key) and the absolute path it is mounted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub controller: String,
    pub path: PathBuf,
}

/// All cgroup mounts found in a mount table, keyed by controller name.
///
/// v1 hierarchies contribute one key per controller, so a co-mounted `cpu,cpuacct`
/// hierarchy yields two keys pointing at the same path. The v2 unified hierarchy is
/// stored under [`CGROUP_V2_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgroupMounts(BTreeMap<String, PathBuf>);

impl CgroupMounts {
    /// Records a mount point. The first mount seen for a controller wins.
    pub fn insert(&mut self, mount: MountPoint) {
        match self.0.get(&mount.controller) {
            Some(existing) => log::debug!(
                "Ignoring duplicate mount for controller `{}` at `{}`, keeping `{}`",
                mount.controller,
                mount.path.display(),
                existing.display()
            ),
            None => {
                self.0.insert(mount.controller, mount.path);
            }
        }
    }

    /// Returns the mount path of the given controller or unified key.
    pub fn get(&self, controller: &str) -> Option<&Path> {
        self.0.get(controller).map(PathBuf::as_path)
    }

    /// Returns the cgroup v2 unified mount path, if one was found.
    pub fn unified(&self) -> Option<&Path> {
        self.get(CGROUP_V2_KEY)
    }

    /// Iterates over v1 controller mounts, skipping the unified key.
    pub fn v1_controllers(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.0
            .iter()
            .filter(|(controller, _)| controller.as_str() != CGROUP_V2_KEY)
            .map(|(controller, path)| (controller.as_str(), path.as_path()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<MountPoint> for CgroupMounts {
    fn from_iter<I: IntoIterator<Item = MountPoint>>(iter: I) -> Self {
        let mut mounts = Self::default();
        for mount in iter {
            mounts.insert(mount);
        }
        mounts
    }
}

impl fmt::Display for CgroupMounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (controller, path)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{controller}: {}", path.display())?;
        }
        f.write_str("}")
    }
}

/// Discovers all cgroup mounts listed in `proc_path/mounts`.
///
/// Mount points are re-rooted below `host_prefix`. Malformed lines are logged and
/// skipped. Finding no cgroup mount at all is not an error here; that is left to
/// [`super::classify`].
///
/// # Errors
///
/// - [`Error::FileOpen`] if the mount table can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use cgroup_reader::mounts::discover_cgroup_mounts;
///
/// let mounts = discover_cgroup_mounts(Path::new(""), Path::new("/proc")).unwrap();
/// println!("cgroup mounts: {mounts}");
/// ```
pub fn discover_cgroup_mounts(host_prefix: &Path, proc_path: &Path) -> Result<CgroupMounts> {
    let path = proc_path.join("mounts");
    let buf = fsutil::open_file_reader(&path)?;

    discover_cgroup_mounts_from_reader(buf, &path, host_prefix)
}

/// Internal implementation of [`discover_cgroup_mounts`] over any buffered reader.
///
/// `origin` is only used in error messages.
fn discover_cgroup_mounts_from_reader<R: BufRead>(
    mut reader: R,
    origin: &Path,
    host_prefix: &Path,
) -> Result<CgroupMounts> {
    let mut line = String::with_capacity(256);
    let mut mounts = CgroupMounts::default();

    while reader
        .read_line(&mut line)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        if !line.trim().is_empty() {
            match parse_mount_line(line.as_str()) {
                Ok(entry) => {
                    for mount in cgroup_mount_points(&entry, host_prefix) {
                        log::debug!(
                            "Found cgroup mount for `{}`: {}",
                            mount.controller,
                            mount.path.display()
                        );
                        mounts.insert(mount);
                    }
                }
                Err(err) => log::warn!("Skipping line in `{}`: {}", origin.display(), err),
            }
        }

        line.clear();
    }

    Ok(mounts)
}

/// Extracts the cgroup mount points described by a single mount table entry.
fn cgroup_mount_points(entry: &MountEntry<'_>, host_prefix: &Path) -> Vec<MountPoint> {
    let path = || fsutil::host_path(host_prefix, Path::new(entry.mount_point.as_ref()));
    match entry.fs_type {
        CGROUP_V2_FS_TYPE => vec![MountPoint {
            controller: CGROUP_V2_KEY.to_owned(),
            path: path(),
        }],
        CGROUP_V1_FS_TYPE => entry
            .options()
            .filter(|opt| CGROUP_V1_CONTROLLERS.contains(opt))
            .map(|controller| MountPoint {
                controller: controller.to_owned(),
                path: path(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    const V1_MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
tmpfs /sys/fs/cgroup tmpfs ro,nosuid,nodev,noexec,mode=755 0 0
cgroup2 /sys/fs/cgroup/unified cgroup2 rw,nosuid,nodev,noexec,relatime,nsdelegate 0 0
cgroup /sys/fs/cgroup/systemd cgroup rw,nosuid,nodev,noexec,relatime,xattr,name=systemd 0 0
cgroup /sys/fs/cgroup/memory cgroup rw,nosuid,nodev,noexec,relatime,memory 0 0
cgroup /sys/fs/cgroup/cpu,cpuacct cgroup rw,nosuid,nodev,noexec,relatime,cpu,cpuacct 0 0
cgroup /sys/fs/cgroup/pids cgroup rw,nosuid,nodev,noexec,relatime,pids 0 0
";

    fn discover(contents: &str, prefix: &str) -> Result<CgroupMounts> {
        let reader = Cursor::new(contents.as_bytes().to_vec());
        discover_cgroup_mounts_from_reader(reader, Path::new("/dummy"), Path::new(prefix))
    }

    #[test]
    fn test_discover_v1_controllers() {
        let mounts = discover(V1_MOUNTS, "").unwrap();

        assert_eq!(mounts.get("memory"), Some(Path::new("/sys/fs/cgroup/memory")));
        assert_eq!(mounts.get("cpu"), Some(Path::new("/sys/fs/cgroup/cpu,cpuacct")));
        assert_eq!(mounts.get("cpuacct"), Some(Path::new("/sys/fs/cgroup/cpu,cpuacct")));
        assert_eq!(mounts.get("pids"), Some(Path::new("/sys/fs/cgroup/pids")));
        assert_eq!(mounts.get("systemd"), None);
        assert_eq!(mounts.unified(), Some(Path::new("/sys/fs/cgroup/unified")));
        assert_eq!(mounts.v1_controllers().count(), 4);
    }

    #[test]
    fn test_discover_v2_with_host_prefix() {
        let input = "cgroup2 /sys/fs/cgroup cgroup2 rw,nosuid,nodev,noexec,relatime 0 0\n";
        let mounts = discover(input, "/host").unwrap();

        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts.unified(), Some(Path::new("/host/sys/fs/cgroup")));
    }

    #[test]
    fn test_discover_no_cgroup_mounts_is_not_an_error() {
        let mounts = discover("proc /proc proc rw,relatime 0 0\n", "").unwrap();
        assert!(mounts.is_empty());
    }

    #[test]
    fn test_first_mount_wins() {
        let input = "\
cgroup /sys/fs/cgroup/memory cgroup rw,memory 0 0
cgroup /other/memory cgroup rw,memory 0 0
";
        let mounts = discover(input, "").unwrap();
        assert_eq!(mounts.get("memory"), Some(Path::new("/sys/fs/cgroup/memory")));
    }

    #[test]
    fn test_discover_skips_malformed_lines() {
        let input = "\
cgroup /sys/fs/cgroup/memory
cgroup /sys/fs/cgroup/pids cgroup rw,pids 0 0
";
        let mounts = discover(input, "").unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts.get("pids"), Some(Path::new("/sys/fs/cgroup/pids")));
        assert_eq!(mounts.get("memory"), None);
    }

    #[test]
    fn test_discover_from_proc_dir() {
        let proc = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(proc.path().join("mounts")).unwrap();
        writeln!(file, "cgroup2 /sys/fs/cgroup cgroup2 rw 0 0").unwrap();

        let mounts = discover_cgroup_mounts(Path::new(""), proc.path()).unwrap();
        assert_eq!(mounts.unified(), Some(Path::new("/sys/fs/cgroup")));
    }

    #[test]
    fn test_discover_missing_mount_table() {
        let proc = tempfile::tempdir().unwrap();
        let err = discover_cgroup_mounts(Path::new(""), proc.path()).unwrap_err();
        match err {
            Error::FileOpen(err) => assert_eq!(err.path, proc.path().join("mounts")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_lists_mounts() {
        let mounts: CgroupMounts = [
            MountPoint {
                controller: "memory".to_owned(),
                path: PathBuf::from("/m"),
            },
            MountPoint {
                controller: "cpu".to_owned(),
                path: PathBuf::from("/c"),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(mounts.to_string(), "{cpu: /c, memory: /m}");
    }
}
