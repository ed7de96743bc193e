//! Error types for webcheck
//!
//! The first group of variants is the failure taxonomy a step handler reasons
//! about. Everything a handler cannot convert into a typed step result escapes
//! as one of these and is recorded through [`Error::status`].

use std::io;
use thiserror::Error;

use crate::testing::Status;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Step failure taxonomy ===
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unable to locate element: {0}")]
    ElementNotFound(String),

    #[error("{0}")]
    AssertionMismatch(String),

    #[error("{0}")]
    NavigationAnomaly(String),

    #[error("Remote session error: {0}")]
    TransportFault(String),

    #[error("Health document error: {0}")]
    SchemaFault(String),

    // === WebDriver specifics ===
    #[error("Unexpected alert open: {0}")]
    UnexpectedAlert(String),

    #[error("No alert present")]
    NoSuchAlert,

    #[error("WebDriver error '{code}': {message}")]
    WebDriver { code: String, message: String },

    #[error("Failed to start browser session for profile '{profile}': {reason}")]
    SessionStart { profile: String, reason: String },

    // === Dispatch Errors ===
    #[error("Unhandled command: {0}")]
    UnhandledCommand(String),

    #[error("Invalid step '{command}': {reason}")]
    InvalidStep { command: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an invalid step error
    pub fn invalid_step(command: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a session start error
    pub fn session_start(profile: &str, reason: impl ToString) -> Self {
        Self::SessionStart {
            profile: profile.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a WebDriver protocol error
    pub fn webdriver(code: &str, message: &str) -> Self {
        Self::WebDriver {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// Status a step is recorded with when this error escapes its handler.
    ///
    /// Failures attributable to the application under test are `Failed`;
    /// everything else is an instrumentation fault and is `Debug`.
    pub fn status(&self) -> Status {
        match self {
            Error::Timeout(_)
            | Error::ElementNotFound(_)
            | Error::AssertionMismatch(_)
            | Error::NavigationAnomaly(_)
            | Error::SchemaFault(_) => Status::Failed,
            _ => Status::Debug,
        }
    }

    /// Whether this error came from the remote browser rather than from
    /// local dispatch or configuration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::TransportFault(_)
                | Error::WebDriver { .. }
                | Error::UnexpectedAlert(_)
                | Error::NoSuchAlert
                | Error::Http(_)
        )
    }
}
