use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "auditarr=info";
const VERBOSE_FILTER: &str = "auditarr=debug";

/// Install the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init(verbose: bool) -> Result<()> {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .with(filter)
        .try_init()
        .map_err(|e| eyre!("failed to install log subscriber: {e}"))
}
