//! Logging setup driven by the configuration's `log-level` and
//! `log-outputs` knobs.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::error::Error;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn default_log_outputs() -> Vec<String> {
    vec!["stderr".to_string()]
}

/// Check that a log level is one tracing understands.
pub fn validate_log_level(level: &str) -> Result<(), Error> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(Error::validation(format!(
            "invalid log-level {other:?} (expected trace|debug|info|warn|error)"
        ))),
    }
}

/// Install the global subscriber for the harness process.
///
/// `log_outputs` entries are `stderr`, `stdout`, or file paths; the
/// first file path wins when no standard stream is listed. `RUST_LOG`
/// still overrides the configured level when set.
pub fn init(log_level: &str, log_outputs: &[String]) -> Result<(), Error> {
    validate_log_level(log_level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if log_outputs.iter().any(|o| o == "stderr") || log_outputs.is_empty() {
        builder.with_writer(std::io::stderr).init();
    } else if log_outputs.iter().any(|o| o == "stdout") {
        builder.with_writer(std::io::stdout).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_outputs[0])?;
        let file = Arc::new(file);
        builder.with_writer(move || Arc::clone(&file)).init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_levels_are_checked_before_install() {
        assert!(validate_log_level("debug").is_ok());
        assert!(validate_log_level("verbose").is_err());
    }
}
