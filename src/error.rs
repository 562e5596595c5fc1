use polars::error::PolarsError;
use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Everything that can go wrong while evaluating a portfolio selector.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Malformed table file, duplicate keys or a cell that is not numeric.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// Empty portfolio, unknown objective kind or a missing cap value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Selector construction or schedule prediction failed.
    #[error("external tool failure: {tool}: {message}")]
    ExternalTool {
        /// The collaborator that failed.
        tool: String,
        /// What went wrong, with branch context.
        message: String,
    },

    /// The selector answered with something that is not a schedule.
    #[error("could not parse schedule: {0}")]
    ScheduleParse(String),

    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataframe construction or csv serialisation failed.
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Cache metadata could not be (de)serialised.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvaluationError {
    /// Shorthand for an [`EvaluationError::ExternalTool`] error.
    pub fn external(tool: &str, message: impl Into<String>) -> Self {
        EvaluationError::ExternalTool {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Prefix the message with where the error happened (instance, solver, branch).
    ///
    /// Wrapped library errors are left untouched.
    pub fn context(self, context: impl AsRef<str>) -> Self {
        let context = context.as_ref();
        match self {
            EvaluationError::DataIntegrity(msg) => {
                EvaluationError::DataIntegrity(format!("{context}: {msg}"))
            }
            EvaluationError::Configuration(msg) => {
                EvaluationError::Configuration(format!("{context}: {msg}"))
            }
            EvaluationError::ExternalTool { tool, message } => {
                EvaluationError::ExternalTool {
                    tool,
                    message: format!("{context}: {message}"),
                }
            }
            EvaluationError::ScheduleParse(msg) => {
                EvaluationError::ScheduleParse(format!("{context}: {msg}"))
            }
            other => other,
        }
    }

    /// Whether this error came from an external collaborator and may be
    /// recovered from inside a leave-one-out branch.
    pub fn is_external(&self) -> bool {
        matches!(self, EvaluationError::ExternalTool { .. })
    }
}
