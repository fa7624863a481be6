/// Entry point for the Cgroup Reader tool.
///
/// Discovers the host's cgroups and prints them as JSON. Configuration is read from
/// `CGROUP_READER_*` environment variables, logging is controlled by `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or cgroup discovery fails.
///
/// # Examples
///
/// ```bash
/// CGROUP_READER_HOST_PREFIX=/host CGROUP_READER_FILTER=container cargo run
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cgroup_reader::run()
}
