use std::path::{Path, PathBuf};
use std::time::Instant;

use super::walk::{Cgroups, insert_unique, walk_hierarchy};
use super::{Cgroup, ReaderFilter, RefreshError};

/// Discovers cgroups on a v2 host by walking the unified hierarchy.
#[derive(Debug, Clone)]
pub struct V2Walker {
    root: PathBuf,
}

impl V2Walker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the unified hierarchy; every accepted directory is a complete [`Cgroup`].
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError::ReadRoot`] if the unified mount cannot be listed.
    pub fn parse_cgroups(&self, filter: &dyn ReaderFilter) -> Result<Cgroups, RefreshError> {
        let before = Instant::now();
        let mut cgroups = Cgroups::new();

        walk_hierarchy(&self.root, filter, |id, path| {
            insert_unique(&mut cgroups, Cgroup::new_v2(id, path));
        })?;

        log::trace!(
            "Discovered {} v2 cgroups in {} microseconds",
            cgroups.len(),
            before.elapsed().as_micros()
        );
        Ok(cgroups)
    }
}
