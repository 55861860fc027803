//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "modelsmith=debug"
    } else {
        "modelsmith=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
