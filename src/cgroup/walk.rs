use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ResultOkLogExt;
use crate::fsutil;
use crate::mounts::CgroupVersion;

use super::{Cgroup, CgroupID, ReaderFilter, RefreshError, V1Walker, V2Walker};

/// Discovered cgroups of one pass, keyed by identifier.
pub type Cgroups = HashMap<CgroupID, Arc<Cgroup>>;

/// The discovery strategy bound at construction, one per cgroup version.
#[derive(Debug, Clone)]
pub enum Walker {
    V1(V1Walker),
    V2(V2Walker),
}

impl Walker {
    pub fn version(&self) -> CgroupVersion {
        match self {
            Walker::V1(_) => CgroupVersion::V1,
            Walker::V2(_) => CgroupVersion::V2,
        }
    }

    /// Runs a full discovery pass.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::ReadRoot`] if the hierarchy root cannot be listed.
    pub fn parse_cgroups(&self, filter: &dyn ReaderFilter) -> Result<Cgroups, RefreshError> {
        match self {
            Walker::V1(walker) => walker.parse_cgroups(filter),
            Walker::V2(walker) => walker.parse_cgroups(filter),
        }
    }
}

/// Walks the hierarchy below `root` breadth-first, handing every directory accepted by
/// `filter` to `visit`.
///
/// Accepted directories are not descended into; unmatched ones are, until the tree is
/// exhausted. Children are visited in name order so that, on identifier collisions, the
/// shallowest and lexicographically first directory wins.
///
/// A subdirectory that disappears mid-walk counts as unmatched. Only failing to list
/// `root` itself aborts the pass.
pub(super) fn walk_hierarchy(
    root: &Path,
    filter: &dyn ReaderFilter,
    mut visit: impl FnMut(CgroupID, PathBuf),
) -> Result<(), RefreshError> {
    let children = fsutil::read_subdirectories(root).map_err(|source| RefreshError::ReadRoot {
        path: root.to_path_buf(),
        source,
    })?;
    let mut queue: VecDeque<(PathBuf, OsString)> = children.into();

    while let Some((path, name)) = queue.pop_front() {
        match identify(filter, &path, &name) {
            Candidate::Accepted(id) => {
                if path.is_dir() {
                    log::trace!("Accepted cgroup `{}` at {}", id, path.display());
                    visit(id, path);
                } else {
                    log::trace!("Cgroup directory vanished: {}", path.display());
                }
                continue;
            }
            Candidate::Skipped => continue,
            Candidate::Unmatched => {}
        }

        match fsutil::read_subdirectories(&path) {
            Ok(children) => queue.extend(children),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::trace!("Cgroup directory vanished: {}", path.display());
            }
            Err(err) => log::warn!("Skipping cgroup directory `{}`: {}", path.display(), err),
        }
    }

    Ok(())
}

enum Candidate {
    Accepted(CgroupID),
    /// The filter failed; the directory is neither included nor descended into.
    Skipped,
    Unmatched,
}

fn identify(filter: &dyn ReaderFilter, path: &Path, name: &OsString) -> Candidate {
    let Some(name) = name.to_str() else {
        log::trace!("Non UTF-8 cgroup directory name: {}", path.display());
        return Candidate::Unmatched;
    };

    let context = || format!("Filter failed for cgroup directory `{}`", path.display());
    match filter.identify(path, name) {
        Ok(Some(id)) if !id.is_empty() => match CgroupID::new(id).ok_log(&context()) {
            Some(id) => Candidate::Accepted(id),
            None => Candidate::Skipped,
        },
        Ok(_) => Candidate::Unmatched,
        Err(err) => {
            log::warn!("{}: {err}", context());
            Candidate::Skipped
        }
    }
}

/// Inserts `cgroup` unless its identifier is already taken.
pub(super) fn insert_unique(cgroups: &mut Cgroups, cgroup: Cgroup) {
    match cgroups.entry(cgroup.id().clone()) {
        Entry::Occupied(existing) => log::debug!(
            "Duplicate cgroup id `{}`, keeping {:?} over {:?}",
            existing.key(),
            existing.get().controller_paths(),
            cgroup.controller_paths()
        ),
        Entry::Vacant(slot) => {
            slot.insert(Arc::new(cgroup));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::{ContainerFilter, DefaultFilter, FilterResult};
    use std::fs;

    const HEX_ID: &str = "abc1230123456789abcdef0123456789abcdef0123456789abcdef0123456789";

    fn collect(root: &Path, filter: &dyn ReaderFilter) -> Vec<(String, PathBuf)> {
        let mut out = Vec::new();
        walk_hierarchy(root, filter, |id, path| out.push((id.to_string(), path))).unwrap();
        out
    }

    #[test]
    fn test_default_filter_stops_at_first_level() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a/nested")).unwrap();
        fs::create_dir_all(root.path().join("b")).unwrap();

        let found = collect(root.path(), &DefaultFilter);
        assert_eq!(
            found,
            vec![
                ("a".to_owned(), root.path().join("a")),
                ("b".to_owned(), root.path().join("b")),
            ]
        );
    }

    #[test]
    fn test_descends_until_filter_matches() {
        let root = tempfile::tempdir().unwrap();
        let scope = format!("system.slice/docker-{HEX_ID}.scope");
        fs::create_dir_all(root.path().join(&scope).join("child")).unwrap();
        fs::create_dir_all(root.path().join("user.slice/user-1000.slice")).unwrap();

        let found = collect(root.path(), &ContainerFilter);
        assert_eq!(found, vec![(HEX_ID.to_owned(), root.path().join(scope))]);
    }

    #[test]
    fn test_filter_errors_skip_directory_only() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bad/inner")).unwrap();
        fs::create_dir_all(root.path().join("good")).unwrap();

        let filter = |_: &Path, name: &str| -> FilterResult {
            match name {
                "bad" => Err("malformed".into()),
                _ => Ok(Some(name.to_owned())),
            }
        };
        let found = collect(root.path(), &filter);
        assert_eq!(found, vec![("good".to_owned(), root.path().join("good"))]);
    }

    #[test]
    fn test_long_path_identifier_is_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("sys/fs/cgroup/unified");
        let scope_path = root
            .join("kubelet.slice/kubelet-kubepods.slice/kubelet-kubepods-burstable.slice")
            .join("kubelet-kubepods-burstable-pod8f3c2a1e_5b7d_4c9e_a1f2_3d4e5f6a7b8c.slice")
            .join(format!("cri-containerd-{HEX_ID}.scope"));
        fs::create_dir_all(&scope_path).unwrap();

        let filter = |path: &Path, name: &str| -> FilterResult {
            Ok(name
                .ends_with(".scope")
                .then(|| path.display().to_string()))
        };
        let found = collect(&root, &filter);

        let id = scope_path.display().to_string();
        assert!(id.len() > 255, "identifier is only {} bytes", id.len());
        assert_eq!(found, vec![(id, scope_path)]);
    }

    #[test]
    fn test_empty_identifier_is_unmatched() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a/b")).unwrap();

        let filter = |_: &Path, name: &str| -> FilterResult {
            let id = if name == "b" { "b" } else { "" };
            Ok(Some(id.to_owned()))
        };
        let found = collect(root.path(), &filter);
        assert_eq!(found, vec![("b".to_owned(), root.path().join("a/b"))]);
    }

    #[test]
    fn test_vanished_directory_is_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("gone/inner")).unwrap();
        fs::create_dir_all(root.path().join("kept")).unwrap();
        let gone = root.path().join("gone");

        // Remove the directory the first time the filter sees it, before it is descended.
        let filter = |path: &Path, name: &str| -> FilterResult {
            if name == "gone" {
                let _ = fs::remove_dir_all(path);
                return Ok(None);
            }
            Ok(Some(name.to_owned()))
        };
        let found = collect(root.path(), &filter);
        assert_eq!(found, vec![("kept".to_owned(), root.path().join("kept"))]);
        assert!(!gone.exists());
    }

    #[test]
    fn test_missing_root_fails() {
        let err = walk_hierarchy(Path::new("/definitely/does/not/exist"), &DefaultFilter, |_, _| {})
            .unwrap_err();
        match err {
            RefreshError::ReadRoot { path, .. } => {
                assert_eq!(path, Path::new("/definitely/does/not/exist"))
            }
        }
    }

    #[test]
    fn test_insert_unique_keeps_first() {
        let mut cgroups = Cgroups::new();
        let id = CgroupID::new("dup").unwrap();
        insert_unique(&mut cgroups, Cgroup::new_v2(id.clone(), PathBuf::from("/first")));
        insert_unique(&mut cgroups, Cgroup::new_v2(id, PathBuf::from("/second")));

        assert_eq!(cgroups.len(), 1);
        assert_eq!(
            cgroups["dup"].controller_path("memory"),
            Some(Path::new("/first"))
        );
    }
}
