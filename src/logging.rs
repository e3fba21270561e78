use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// RUST_LOG wins when set; otherwise `verbose` picks warn/info/debug/trace.
/// Output goes to stderr so stdout stays clean for ids and paths.
pub fn init(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pathcache={default_level}")));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}
