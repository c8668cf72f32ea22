use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// command output. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Human => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(err) = installed {
        eprintln!("costgraphd: failed to install {} logger: {err}", format.as_str());
    }
}
