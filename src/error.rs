//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(!e.to_string().is_empty());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn comms_error_display() {
        let e = AppError::Comms("gateway closed".into());
        assert!(e.to_string().contains("gateway closed"));
    }

    #[test]
    fn logger_error_display() {
        let e = AppError::Logger("already initialized".into());
        assert!(e.to_string().contains("already initialized"));
    }

    #[test]
    fn provider_error_converts() {
        let e: AppError = ProviderError::Service("HTTP 503".into()).into();
        assert!(e.to_string().contains("provider error"));
        assert!(e.to_string().contains("HTTP 503"));
    }

    #[test]
    fn provider_error_is_the_source() {
        let e: AppError = ProviderError::Other("bad body".into()).into();
        // thiserror forwards the wrapped error as `source`.
        assert!(e.source().is_some());
    }
}
