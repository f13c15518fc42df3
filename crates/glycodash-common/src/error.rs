use thiserror::Error;

/// Top-level error taxonomy shared by every Glycodash crate.
///
/// Component crates keep their own narrower error enums and convert into
/// this one at their boundary.
#[derive(Debug, Error)]
pub enum GlycodashError {
    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("Failed to load {kind}: {cause}")]
    DataLoad { kind: String, cause: String },

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Invalid taxonomy value '{value}' for level {level}")]
    InvalidTaxonomyValue { level: String, value: String },

    #[error("Invalid target label: {0}")]
    InvalidTarget(String),

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GlycodashError {
    /// Whether the error is a user-input validation failure that should be
    /// rendered as an empty view instead of an error page.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCriteria(_) | Self::InvalidTaxonomyValue { .. } | Self::InvalidTarget(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GlycodashError>;
