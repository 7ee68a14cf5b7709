//! Error types for the reply engine
//!
//! This module defines the domain error types used throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the browsing collaborator while working on a single candidate
///
/// Every variant is transient from the scheduler's point of view: the current
/// candidate is abandoned and the loop moves on.
#[derive(Error, Debug)]
pub enum UiError {
    /// Element could not be located
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element reference went stale between lookup and use
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Another element received the click
    #[error("Click intercepted: {0}")]
    ClickIntercepted(String),

    /// Waiting for a page or element timed out
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Navigation did not reach the expected page
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// WebDriver returned an error payload we do not map explicitly
    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    /// Transport-level failure talking to the driver
    #[error("Driver HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// No browser session has been created yet
    #[error("Browser session not started")]
    SessionNotStarted,
}

impl UiError {
    /// Map a W3C WebDriver error code to a typed error
    pub fn from_protocol(error: &str, message: &str) -> Self {
        match error {
            "no such element" => Self::ElementNotFound(message.to_string()),
            "stale element reference" => Self::StaleElement(message.to_string()),
            "element click intercepted" => Self::ClickIntercepted(message.to_string()),
            "timeout" | "script timeout" => Self::Timeout(message.to_string()),
            "invalid session id" => Self::SessionNotStarted,
            _ => Self::Protocol {
                error: error.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// Failure of a single completion backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP transport error
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the completion API
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The completion contained no usable text
    #[error("Provider returned an empty completion")]
    EmptyResponse,

    /// The response body could not be decoded
    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    /// Prompt template could not be rendered
    #[error("Prompt template error: {0}")]
    Template(String),

    /// The pool has no providers to try
    #[error("No completion providers configured")]
    NoProviders,
}

/// Failure to read or append the processed-identifier log
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Log file could not be opened
    #[error("Failed to open ledger {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be read at startup
    #[error("Failed to read ledger {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appending a record failed
    #[error("Failed to append to ledger {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
