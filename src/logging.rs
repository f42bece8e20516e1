//! Tracing setup for the `ziplode` binary.
//!
//! `RUST_LOG` takes precedence over the defaults chosen here:
//!
//! ```bash
//! RUST_LOG=ziplode=trace ziplode generate out.zip   # every entry
//! RUST_LOG=warn ziplode generate out.zip            # warnings only
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Output goes to stderr so `--json` reports on
/// stdout stay machine readable. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ziplode=debug")
        } else {
            EnvFilter::new("ziplode=info")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}
