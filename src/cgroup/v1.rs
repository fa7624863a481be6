use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use crate::mounts::CgroupMounts;

use super::walk::{Cgroups, insert_unique, walk_hierarchy};
use super::{Cgroup, ReaderFilter, RefreshError};

/// Discovers cgroups on a v1 host.
///
/// Only the base controller's hierarchy is walked. Every accepted directory's path,
/// relative to the base mount, is then mirrored onto the other controllers' mounts,
/// relying on container runtimes laying out all controllers identically.
#[derive(Debug, Clone)]
pub struct V1Walker {
    base_controller: String,
    base_root: PathBuf,
    controllers: BTreeMap<String, PathBuf>,
}

impl V1Walker {
    /// Binds a walker to the v1 mounts, or returns `None` if `base_controller` is not
    /// mounted.
    pub fn new(mounts: &CgroupMounts, base_controller: &str) -> Option<Self> {
        let base_root = mounts.get(base_controller)?.to_path_buf();
        let controllers = mounts
            .v1_controllers()
            .map(|(controller, path)| (controller.to_owned(), path.to_path_buf()))
            .collect();

        Some(Self {
            base_controller: base_controller.to_owned(),
            base_root,
            controllers,
        })
    }

    pub fn base_controller(&self) -> &str {
        &self.base_controller
    }

    /// Walks the base controller's hierarchy and builds one [`Cgroup`] per accepted
    /// directory.
    ///
    /// A controller lacking the mirrored directory is left out of that cgroup's
    /// controller paths; this is not an error since some controllers may be disabled.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::ReadRoot`] if the base controller's mount cannot be listed.
    pub fn parse_cgroups(&self, filter: &dyn ReaderFilter) -> Result<Cgroups, RefreshError> {
        let before = Instant::now();
        let mut cgroups = Cgroups::new();

        walk_hierarchy(&self.base_root, filter, |id, path| {
            let Ok(relative) = path.strip_prefix(&self.base_root) else {
                return;
            };

            let mut controller_paths = BTreeMap::new();
            for (controller, root) in &self.controllers {
                if *controller == self.base_controller {
                    controller_paths.insert(controller.clone(), path.clone());
                    continue;
                }
                let mirrored = root.join(relative);
                if mirrored.is_dir() {
                    controller_paths.insert(controller.clone(), mirrored);
                } else {
                    log::trace!(
                        "Controller `{}` has no directory for cgroup `{}`",
                        controller,
                        id
                    );
                }
            }

            insert_unique(&mut cgroups, Cgroup::new_v1(id, controller_paths));
        })?;

        log::trace!(
            "Discovered {} v1 cgroups in {} microseconds",
            cgroups.len(),
            before.elapsed().as_micros()
        );
        Ok(cgroups)
    }
}
