//! Error types for pledge-dl
//!
//! One crate-wide [`Error`] enum with a [`Result`] alias. External failures
//! (transport, decode, filesystem) convert via `#[from]`; configuration and
//! API-status problems carry their own context.

use thiserror::Error;

/// Result type alias for pledge-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pledge-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_base")
        key: Option<String>,
    },

    /// Network transport error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The platform API answered with a non-success status
    #[error("API request failed with status {status}: {url}")]
    Api {
        /// HTTP status code returned by the platform
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// A URL received from configuration or the API could not be parsed
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL text
        url: String,
        /// Parser diagnostic
        message: String,
    },

    /// Response body decode error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
