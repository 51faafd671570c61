// src/error.rs

//! Unified error handling for the schedule crawler.

use std::fmt;

use thiserror::Error;

use crate::models::Slot;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failed before a response was available
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A page could not be fetched
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Extraction pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Record mapping error (unknown column, undecodable row)
    #[error("Schema error: {0}")]
    Schema(String),

    /// A store could not be reached or is no longer usable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The active slot changed underneath a flip
    #[error("Slot switch conflict: expected {expected}, found {found}")]
    SwitchConflict { expected: Slot, found: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a pattern compilation error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// A single chunk that could not be turned into a record.
///
/// Offsets are byte positions of the chunk within the scanned document.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("chunk at {offset}: missing {field}")]
    MissingField { offset: usize, field: &'static str },

    #[error("chunk at {offset}: invalid SLN {value:?}")]
    InvalidSln { offset: usize, value: String },

    #[error("section {sln} at {offset} precedes every class")]
    OrphanSection { offset: usize, sln: String },

    #[error("section {sln}: meeting times not serializable: {source}")]
    MeetingTimes {
        sln: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Accumulated per-chunk extraction failures.
#[derive(Debug, Default)]
pub struct ExtractErrors(Vec<ExtractError>);

impl ExtractErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ExtractError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractError> {
        self.0.iter()
    }
}

impl fmt::Display for ExtractErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExtractErrors {}
