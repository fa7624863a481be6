//! Cgroup Reader: discovers the cgroups of a Linux host and serves cached snapshots of
//! their controller directories.
//!
//! The library locates cgroup filesystems in the mount table, detects whether the host
//! uses the v1 (one hierarchy per controller) or v2 (unified) layout, and walks the
//! hierarchy to build [`cgroup::Cgroup`] entities. Parsing the stat files inside the
//! discovered directories is left to callers.
pub mod cgroup;
pub mod error;
pub mod fsutil;
pub mod mounts;
pub mod reader;

/// Runs the Cgroup Reader binary.
///
/// Builds a [`reader::Reader`] from `CGROUP_READER_*` environment variables, runs one
/// discovery pass and prints the snapshot as JSON to stdout.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values.
/// - An unreadable mount table or an unrecognized cgroup layout.
/// - Failure to list the cgroup hierarchy root.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = reader::ReaderConfig::from_env()?;
    log::debug!("Reader configuration: {config:?}");

    let reader = reader::Reader::new(config)?;
    let snapshot = reader.snapshot()?;
    log::info!(
        "Discovered {} cgroups (cgroup {})",
        snapshot.len(),
        reader.version()
    );

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, snapshot.as_ref())?;
    std::io::Write::write_all(&mut stdout, b"\n")?;
    Ok(())
}
