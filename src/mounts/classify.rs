use serde::Serialize;

use super::CgroupMounts;

/// Layout of the cgroup hierarchy on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CgroupVersion {
    /// One hierarchy per controller.
    V1,
    /// A single unified hierarchy.
    V2,
}

impl std::fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CgroupVersion::V1 => f.write_str("v1"),
            CgroupVersion::V2 => f.write_str("v2"),
        }
    }
}

/// Decides which cgroup version the discovered mounts describe.
///
/// Any v1 controller mount selects [`CgroupVersion::V1`]. On hybrid hosts the unified
/// hierarchy is mounted next to the v1 ones but carries no controllers, so it does not
/// change the outcome. A lone unified mount selects [`CgroupVersion::V2`].
///
/// Returns `None` if no cgroup mount was found.
pub fn classify(mounts: &CgroupMounts) -> Option<CgroupVersion> {
    if mounts.v1_controllers().next().is_some() {
        if mounts.unified().is_some() {
            log::debug!("Hybrid cgroup layout detected, ignoring the unified hierarchy");
        }
        return Some(CgroupVersion::V1);
    }

    mounts.unified().map(|_| CgroupVersion::V2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mounts::{CGROUP_V2_KEY, MountPoint};
    use std::path::PathBuf;

    fn mounts(controllers: &[&str]) -> CgroupMounts {
        controllers
            .iter()
            .map(|controller| MountPoint {
                controller: (*controller).to_owned(),
                path: PathBuf::from("/sys/fs/cgroup").join(controller),
            })
            .collect()
    }

    #[test]
    fn test_only_controllers_is_v1() {
        assert_eq!(classify(&mounts(&["memory"])), Some(CgroupVersion::V1));
        assert_eq!(
            classify(&mounts(&["memory", "cpu", "cpuacct", "pids"])),
            Some(CgroupVersion::V1)
        );
    }

    #[test]
    fn test_only_unified_is_v2() {
        assert_eq!(classify(&mounts(&[CGROUP_V2_KEY])), Some(CgroupVersion::V2));
    }

    #[test]
    fn test_hybrid_is_v1() {
        assert_eq!(
            classify(&mounts(&["memory", CGROUP_V2_KEY])),
            Some(CgroupVersion::V1)
        );
    }

    #[test]
    fn test_no_mounts_is_unknown() {
        assert_eq!(classify(&CgroupMounts::default()), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(CgroupVersion::V1.to_string(), "v1");
        assert_eq!(CgroupVersion::V2.to_string(), "v2");
    }
}
