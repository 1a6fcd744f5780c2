//! Logging initialisation via tracing-subscriber.
//!
//! `RUST_LOG` wins when it is set and parses. Otherwise the configured level
//! applies to everything except the Discord gateway, which is capped at
//! `warn` so heartbeat chatter stays out of `info` logs.

use std::env;

use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber on stderr. Call once, after config load.
pub fn init(level: &str) -> Result<(), AppError> {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, rejected) = build_filter(rust_log.as_deref(), level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    if let Some(reason) = rejected {
        warn!(%reason, "ignoring invalid RUST_LOG, using configured level");
    }
    Ok(())
}

/// Filter for the given `RUST_LOG` value and configured level. The second
/// element carries the parse error when a non-empty `RUST_LOG` was rejected.
fn build_filter(rust_log: Option<&str>, level: &str) -> Result<(EnvFilter, Option<String>), AppError> {
    let mut rejected = None;
    if let Some(directives) = rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return Ok((filter, None)),
            Err(e) => rejected = Some(format!("'{directives}': {e}")),
        }
    }

    let level = parse_level(level)?;
    let gateway = level.min(LevelFilter::WARN);
    let filter = EnvFilter::try_new(format!("{level},serenity={gateway}"))
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?;
    Ok((filter, rejected))
}

/// Parse a log level string into a [`LevelFilter`], returning an error on
/// unrecognised values. Used to validate `log_level` while loading config.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(filter: &EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn valid_levels_parse() {
        for l in &["error", "warn", "info", "debug", "trace"] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
    }

    #[test]
    fn invalid_level_errors() {
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("").is_err());
        assert!(parse_level("INFO_LEVEL").is_err());
    }

    #[test]
    fn rust_log_takes_precedence() {
        let (filter, rejected) = build_filter(Some("relay_bot=trace"), "info").unwrap();
        assert!(directives(&filter).contains("relay_bot=trace"));
        assert!(!directives(&filter).contains("serenity"));
        assert!(rejected.is_none());
    }

    #[test]
    fn configured_level_when_rust_log_unset_or_blank() {
        for rust_log in [None, Some(""), Some("   ")] {
            let (filter, rejected) = build_filter(rust_log, "debug").unwrap();
            let d = directives(&filter);
            assert!(d.contains("debug"), "{d}");
            assert!(d.contains("serenity=warn"), "{d}");
            assert!(rejected.is_none());
        }
    }

    #[test]
    fn gateway_cap_never_raises_verbosity() {
        let (filter, _) = build_filter(None, "error").unwrap();
        assert!(directives(&filter).contains("serenity=error"));
    }

    #[test]
    fn invalid_rust_log_falls_back_and_is_reported() {
        let (filter, rejected) = build_filter(Some("relay_bot=loud"), "info").unwrap();
        assert!(directives(&filter).contains("info"));
        assert!(rejected.unwrap().contains("relay_bot=loud"));
    }

    #[test]
    fn invalid_configured_level_errors() {
        assert!(build_filter(None, "verbose").is_err());
    }
}
