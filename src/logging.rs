//! Tracing initialization (SPEC_FULL §10), grounded on the teacher's
//! `registry().with(env_filter).with(fmt_layer).try_init()` shape, minus the
//! TUI-specific log redirection this binary doesn't need.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber once. `RUST_LOG` takes precedence when
/// set; otherwise `--verbose` raises the executor's own crates from `warn`
/// to `debug`.
pub fn init(verbose: bool) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("warn,runbook_core=debug,runbook_config=debug,runbook_fuzz=debug,runbook_exec=debug,runbook_assert=debug")
    } else {
        EnvFilter::new("warn")
    };

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::warn!("tracing already initialized; skipping logging setup");
    }
}
