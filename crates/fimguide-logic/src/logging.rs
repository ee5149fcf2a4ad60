//! Shared logging initialization for the dashboard binaries
//!
//! Handles LOG_DESTINATION=console|file, LOG_DIR, LOG_FILE_PREFIX env vars.
//! Console logs go to stderr so rendered panels on stdout stay clean.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the level filter.
///
/// Verbose mode forces debug for `crate_names`; otherwise RUST_LOG wins and
/// falls back to info for `crate_names`, warn for everything else.
pub fn build_filter(verbose: bool, crate_names: &[&str]) -> EnvFilter {
    if verbose {
        return EnvFilter::new(directives(crate_names, "debug", "info"));
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(crate_names, "info", "warn")))
}

fn directives(crate_names: &[&str], level: &str, fallback: &str) -> String {
    let mut parts: Vec<String> = crate_names
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect();
    parts.push(fallback.to_string());
    parts.join(",")
}

/// Initialize the tracing subscriber.
///
/// - `verbose`: if true, sets debug level for the given `crate_names`
/// - `crate_names`: crate names to enable at debug level when verbose
/// - `default_log_prefix`: LOG_FILE_PREFIX fallback when LOG_DESTINATION=file
///
/// Returns the file writer guard when logging to a file; keep it alive until
/// exit so buffered lines are flushed.
pub fn init_logging(
    verbose: bool,
    crate_names: &[&str],
    default_log_prefix: &str,
) -> Option<WorkerGuard> {
    let filter = build_filter(verbose, crate_names);

    let log_dest = std::env::var("LOG_DESTINATION").unwrap_or_else(|_| "console".to_string());
    if log_dest.eq_ignore_ascii_case("file") {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        let log_prefix = std::env::var("LOG_FILE_PREFIX")
            .unwrap_or_else(|_| default_log_prefix.to_string());
        let file_appender = tracing_appender::rolling::daily(&log_dir, &log_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .with(filter)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(
            directives(&["fimguide", "fimguide_logic"], "debug", "info"),
            "fimguide=debug,fimguide_logic=debug,info"
        );
        assert_eq!(directives(&[], "info", "warn"), "warn");
    }

    #[test]
    fn test_verbose_filter_ignores_env() {
        let filter = build_filter(true, &["fimguide"]);
        assert!(filter.to_string().contains("fimguide=debug"));
    }
}
