use tracing_subscriber::EnvFilter;

/// Initialise structured logging on stderr.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to `default_level`.
/// Stdout is left to the final summary.
pub fn init(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
