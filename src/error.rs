//! Startup-time error types. Runtime faults (a bad client frame, a full
//! mailbox) are handled locally where they occur and never surface here —
//! only configuration and listener failures propagate to `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("{0} must be a valid TCP port number, got {1:?}")]
    InvalidPort(&'static str, String),
}
