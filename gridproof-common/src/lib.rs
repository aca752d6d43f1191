//! Common types and utilities shared across gridproof crates.
//!
//! This crate defines the shared error taxonomy, the browser selection enum,
//! the polling helper used for every bounded wait, and the tracing
//! initialisation used by binaries and tests.
//!
//! # Overview
//!
//! - [`GridproofError`] and [`Result`]: Shared error handling
//! - [`ErrorKind`]: Coarse classification reported to users and in run reports
//! - [`BrowserKind`]: Which WebDriver flavour a session talks to
//! - [`wait`]: Deadline-bounded polling
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use gridproof_common::{ErrorKind, GridproofError};
//!
//! let err = GridproofError::ElementNotFound {
//!     target: "button \"New Game\"".into(),
//!     timeout_ms: 5000,
//! };
//! assert_eq!(err.kind(), ErrorKind::ElementNotFound);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod observability;
pub mod wait;

/// Browser behind the WebDriver endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserKind::Chrome => f.write_str("chrome"),
            BrowserKind::Firefox => f.write_str("firefox"),
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = GridproofError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" | "gecko" => Ok(BrowserKind::Firefox),
            other => Err(GridproofError::Config(format!("unknown browser: {other}"))),
        }
    }
}

/// Error types used across the gridproof system.
#[derive(thiserror::Error, Debug)]
pub enum GridproofError {
    /// A required control was not discoverable within the timeout.
    #[error("element not found: {target} (waited {timeout_ms} ms)")]
    ElementNotFound { target: String, timeout_ms: u64 },

    /// The control exists but does not offer the requested option.
    #[error("option {option:?} not found in {target}")]
    OptionNotFound { target: String, option: String },

    /// A polled condition never became true.
    #[error("condition not met: {condition} (waited {timeout_ms} ms)")]
    ConditionTimeout { condition: String, timeout_ms: u64 },

    /// The screenshot could not be persisted.
    #[error("failed to write artifact {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser could not load the target document.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The WebDriver session could not be created or has gone away.
    #[error("Session error: {0}")]
    Session(String),

    /// A driver (browser, network, etc.) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A step plan failed validation.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// The flow state machine was asked to skip or repeat a state.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl GridproofError {
    /// Classify this error into the coarse taxonomy reported to callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridproofError::ElementNotFound { .. } | GridproofError::OptionNotFound { .. } => {
                ErrorKind::ElementNotFound
            }
            GridproofError::ConditionTimeout { .. } => ErrorKind::ConditionTimeout,
            GridproofError::ArtifactWrite { .. } => ErrorKind::ArtifactWrite,
            GridproofError::Navigation(_)
            | GridproofError::Session(_)
            | GridproofError::Driver(_) => ErrorKind::Driver,
            GridproofError::Config(_)
            | GridproofError::InvalidPlan(_)
            | GridproofError::InvalidTransition { .. } => ErrorKind::Config,
        }
    }
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ElementNotFound,
    ConditionTimeout,
    ArtifactWrite,
    Driver,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::ConditionTimeout => "condition_timeout",
            ErrorKind::ArtifactWrite => "artifact_write",
            ErrorKind::Driver => "driver",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}

/// Convenient alias for results that use [`GridproofError`].
pub type Result<T> = std::result::Result<T, GridproofError>;
