//! Unified error handling for the replybot crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ReplyErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use replybot::error::{Error, ReplyErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(error = %err, "Skipping candidate");
//!     } else {
//!         tracing::error!(error = %err, "Stopping run");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::utils::error::{PersistenceError, ProviderError, UiError};

/// Common trait for all replybot error types
pub trait ReplyErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the run may continue)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Browser automation errors scoped to one candidate
    Ui,
    /// Completion backend errors
    Provider,
    /// Ledger and file I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Provider => "provider",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl ReplyErrorTrait for UiError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Ui
    }
}

impl ReplyErrorTrait for ProviderError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Provider
    }
}

impl ReplyErrorTrait for PersistenceError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the replybot crate
#[derive(Error, Debug)]
pub enum Error {
    /// Browser automation errors
    #[error("UI error: {0}")]
    Ui(#[from] UiError),

    /// Completion provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Ledger persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ReplyErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Ui(e) => e.is_recoverable(),
            Self::Provider(e) => e.is_recoverable(),
            Self::Persistence(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Ui(_) => ErrorCategory::Ui,
            Self::Provider(_) => ErrorCategory::Provider,
            Self::Persistence(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
