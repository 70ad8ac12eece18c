//! Error types for orbital-cdn.
//!
//! This module provides a unified error type [`OrbitalError`] for every
//! operation in the crate, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Lookup**: content missing from the catalog, unknown node ids
//! - **Configuration**: invalid capacities, network metrics or files,
//!   always rejected at construction time
//! - **Invariant violations**: internal cache inconsistencies that must never
//!   happen under a correct implementation
//!
//! A cache miss is not an error: it is the expected slow path and is reported
//! through the request trace.
//!
//! # Example
//!
//! ```rust
//! use orbital_cdn::error::{OrbitalError, Result};
//!
//! fn capacity(value: usize) -> Result<usize> {
//!     if value == 0 {
//!         return Err(OrbitalError::InvalidConfig {
//!             field: "cache.capacity".into(),
//!             reason: "capacity must be positive".into(),
//!         });
//!     }
//!     Ok(value)
//! }
//!
//! assert!(capacity(0).unwrap_err().is_config());
//! ```

use std::io;
use thiserror::Error;

/// Main error type for orbital-cdn operations.
#[derive(Error, Debug)]
pub enum OrbitalError {
    // Lookup errors
    #[error("Content not found in catalog: {0}")]
    ContentNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Internal errors
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl OrbitalError {
    /// Check if the error was raised while validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            OrbitalError::Config(_) | OrbitalError::InvalidConfig { .. }
        )
    }

    /// Check if the error signals a broken internal invariant.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, OrbitalError::InvariantViolation(_))
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OrbitalError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for OrbitalError {
    fn from(e: serde_json::Error) -> Self {
        OrbitalError::Serialization(e.to_string())
    }
}

/// Result type alias for orbital-cdn operations.
pub type Result<T> = std::result::Result<T, OrbitalError>;
