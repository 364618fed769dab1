//! Log setup shared by the binaries

use tracing_subscriber::EnvFilter;

/// Filter directives for `targets`: `warn` normally, `trace` when debugging
pub fn default_directives(debug: bool, targets: &[&str]) -> String {
    let level = if debug { "trace" } else { "warn" };
    targets
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs a JSON subscriber writing to stdout
///
/// `RUST_LOG` overrides the debug toggle when set.
pub fn init(debug: bool, targets: &[&str]) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug, targets)));
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stdout)
        .with_env_filter(filter)
        .init();
}
