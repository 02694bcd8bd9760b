//! Crate-wide error type.
//!
//! Most degraded conditions here are handled in place (skip, warn, fall
//! back) rather than surfaced. What reaches `Error` is the genuinely fatal
//! subset: broken persistence, unusable configuration, a save against a
//! missing plan, a caller without permission.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration could not be serialized or applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A catalog file failed validation on load.
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// A plan document could not be addressed or written.
    #[error("Plan store error: {0}")]
    Store(String),

    /// A save referenced a plan document that does not exist.
    #[error("Plan error: {0}")]
    Plan(String),

    /// The caller may not perform the requested operation.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Other(String),
}
