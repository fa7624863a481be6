use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// A kernel interface file, such as the mount table, could not be opened.
#[derive(Debug, thiserror::Error)]
#[error("cannot open `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens `path` for line-by-line reading. The failing path is kept in the error.
///
/// ```no_run
/// # use std::io::BufRead;
/// # use cgroup_reader::fsutil;
/// let mounts = fsutil::open_file_reader("/host/proc/mounts")?;
/// let cgroup_lines = mounts
///     .lines()
///     .map_while(Result::ok)
///     .filter(|line| line.contains(" cgroup"))
///     .count();
/// println!("{cgroup_lines} cgroup mounts");
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| FileOpenError {
            path: path.to_path_buf(),
            source,
        })
}

/// Re-roots an absolute path below `prefix`.
///
/// Used when the host filesystem is bind mounted somewhere inside a container, e.g.
/// `/sys/fs/cgroup` seen through `/host` becomes `/host/sys/fs/cgroup`. An empty prefix
/// returns the path unchanged.
pub fn host_path(prefix: &Path, path: &Path) -> PathBuf {
    if prefix.as_os_str().is_empty() {
        return path.to_path_buf();
    }
    prefix.join(path.strip_prefix("/").unwrap_or(path))
}

/// Lists the subdirectories of `path`, sorted by file name.
///
/// Symlinks and regular files are skipped. Entries that vanish between listing and
/// inspection are silently dropped.
///
/// # Errors
///
/// Returns the underlying I/O error if `path` itself cannot be listed.
pub fn read_subdirectories(path: &Path) -> io::Result<Vec<(PathBuf, std::ffi::OsString)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let Ok(entry) = entry else {
            continue;
        };
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => dirs.push((entry.path(), entry.file_name())),
            _ => {}
        }
    }
    dirs.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(dirs)
}
