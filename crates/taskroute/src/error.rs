//! Error taxonomy shared by the router, the sinks, and the review layer.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a task request and its log record.
///
/// Configuration and input errors (`UnknownTask`, `UnknownModel`,
/// `MissingPlaceholder`, `MalformedTemplate`, `InvalidArguments`) are raised
/// before any network call or log write. `CompletionApi` is always logged
/// before it reaches the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Prompt template for task '{task}' needs a value for '{name}'")]
    MissingPlaceholder { task: String, name: String },

    #[error("Prompt template for task '{task}' is malformed: {reason}")]
    MalformedTemplate { task: String, reason: String },

    #[error("Task '{task}' expects {expected} arguments, got {actual}")]
    InvalidArguments {
        task: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Completion API error: {0}")]
    CompletionApi(String),

    #[error("Log store unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Feedback record '{0}' not found")]
    FeedbackNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether this error was raised before anything left the process.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownTask(_)
                | Self::UnknownModel(_)
                | Self::MissingPlaceholder { .. }
                | Self::MalformedTemplate { .. }
                | Self::InvalidArguments { .. }
                | Self::Config(_)
        )
    }

    /// Local file or stream failure outside the log and feedback stores.
    pub fn io(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Io(format!("{context}: {err}"))
    }

    pub(crate) fn sink(context: &str, err: impl std::fmt::Display) -> Self {
        Self::SinkUnavailable(format!("{context}: {err}"))
    }
}
