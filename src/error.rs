//! Wolfpack Error Types

use thiserror::Error;

/// Result type alias for Wolfpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wolfpack error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The only fatal runtime condition: without a local identity the node
    /// cannot participate at all.
    #[error("Local address not found among the {configured} configured peers")]
    LocalAddressNotFound { configured: usize },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
