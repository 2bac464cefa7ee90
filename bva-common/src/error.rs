//! Common error types for BVA

use thiserror::Error;

/// Common result type for BVA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the BVA crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file is not valid TOML for the expected schema
    #[error("Config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
