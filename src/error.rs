//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors (e.g., [`ListingError`](crate::listing::ListingError),
//!   [`StoreError`](crate::db::StoreError)) for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use concert_minder::error::{Error, Result};
//!
//! async fn load(path: &Path) -> Result<CandidateFolder> {
//!     let folder = scanner::load_folder(path)?; // IO errors auto-convert
//!     Ok(folder)
//! }
//! ```

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Fingerprint store error
    #[error("Store error: {0}")]
    Store(#[from] crate::db::StoreError),

    /// Remote metadata service error
    #[error("Remote error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    /// Track listing could not be parsed
    #[error("Listing error: {0}")]
    Listing(#[from] crate::listing::ListingError),

    /// Folder name could not be normalized or renamed
    #[error("Normalize error: {0}")]
    Normalize(#[from] crate::organizer::NormalizeError),

    /// Metadata reading error
    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, crate::db::StoreError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Store(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/shows/gd1977-05-08.sbd");
        assert!(err.to_string().contains("/shows/gd1977-05-08.sbd"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::Listing(crate::listing::ListingError::NoListings)
            .context("while labeling gd75-07-05");
        let msg = err.to_string();
        assert!(msg.contains("while labeling gd75-07-05"));
    }

    #[test]
    fn test_metadata_error() {
        let err = Error::metadata("/shows/d1t01.flac", "no STREAMINFO signature");
        let msg = err.to_string();
        assert!(msg.contains("d1t01.flac"));
        assert!(msg.contains("no STREAMINFO signature"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk gone"));
        let with_ctx = result.with_context("reading listing");
        assert!(with_ctx.unwrap_err().to_string().contains("reading listing"));
    }
}
