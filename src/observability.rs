//! Shared tracing configuration for observability instrumentation.
//!
//! Centralises the log target used for subscriber setup and installs the
//! binary's stderr subscriber so stdout stays reserved for action outputs.

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Target used by observability spans and logs.
pub(crate) const LOG_TARGET: &str = "codeql_setup::observability";

/// Variable the runner sets to `1` when step debug logging is enabled.
const RUNNER_DEBUG_ENV: &str = "RUNNER_DEBUG";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence. Without it the level is `info`, or `debug`
/// when the runner requests debug logging. A subscriber installed earlier is
/// left in place.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(runner_debug_enabled())));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(err) = installed {
        debug!(target: LOG_TARGET, "tracing subscriber already installed: {err}");
    }
}

fn runner_debug_enabled() -> bool {
    std::env::var(RUNNER_DEBUG_ENV).is_ok_and(|value| value.trim() == "1")
}

const fn default_directive(debug_enabled: bool) -> &'static str {
    if debug_enabled { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use temp_env::with_var;

    #[rstest]
    #[case(Some("1"), true)]
    #[case(Some(" 1 "), true)]
    #[case(Some("0"), false)]
    #[case(Some("true"), false)]
    #[case(None, false)]
    fn runner_debug_flag(#[case] value: Option<&str>, #[case] expected: bool) {
        with_var(RUNNER_DEBUG_ENV, value, || {
            assert_eq!(runner_debug_enabled(), expected);
        });
    }

    #[test]
    fn default_directive_follows_debug_flag() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }
}
