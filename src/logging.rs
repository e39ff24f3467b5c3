//! Tracing setup.
//!
//! Progress goes to stderr through `tracing`. `-q` shows warnings and errors
//! only, `-v` adds debug output (including every external command), and
//! `RUST_LOG` overrides both.

use tracing_subscriber::EnvFilter;

/// Level filter for the verbosity flags.
pub fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. ANSI colours only when `color` is set.
pub fn init_tracing(verbose: bool, quiet: bool, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    // A subscriber may already be installed (tests); keep the first one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .without_time()
        .try_init();
}
