//! Unified logging initialization for all Rentwise binaries
//!
//! This module provides a standardized logging setup that respects the following priority order:
//! 1. CLI flags (`-v/-q`) - highest priority
//! 2. RUST_LOG environment variable
//! 3. Binary-specific defaults - lowest priority

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified verbosity level and default filter.
///
/// # Arguments
///
/// * `verbosity` - The verbosity flags from clap (-v/-q)
/// * `default_filter` - The default filter string if no CLI flags or RUST_LOG are set
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{Verbosity, InfoLevel};
/// use rentwise_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "rentwise_rental=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = build_filter(verbosity.log_level(), default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Pick the filter: explicit CLI level first, then RUST_LOG, then the default.
fn build_filter(
    cli_level: Option<clap_verbosity_flag::Level>,
    default_filter: &str,
) -> Result<EnvFilter> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level.to_string())?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    };
    Ok(filter)
}
