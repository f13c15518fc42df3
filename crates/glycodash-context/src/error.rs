use thiserror::Error;

use glycodash_common::GlycodashError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unrecognized criteria '{0}'")]
    InvalidCriteria(String),

    #[error("unrecognized taxonomy level '{0}'")]
    InvalidTaxonomyLevel(String),

    #[error("'{value}' is not a known {level}")]
    InvalidTaxonomyValue { level: String, value: String },

    #[error("'{target}' is not a known {facet}")]
    InvalidTarget { facet: String, target: String },

    #[error("context service returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("context service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("context service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl QueryError {
    /// User-input validation failures. These render as an empty view.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCriteria(_)
                | Self::InvalidTaxonomyLevel(_)
                | Self::InvalidTaxonomyValue { .. }
                | Self::InvalidTarget { .. }
        )
    }
}

impl From<QueryError> for GlycodashError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidCriteria(raw) => GlycodashError::InvalidCriteria(raw),
            QueryError::InvalidTaxonomyLevel(raw) => {
                GlycodashError::InvalidCriteria(format!("taxonomy level '{raw}'"))
            }
            QueryError::InvalidTaxonomyValue { level, value } => {
                GlycodashError::InvalidTaxonomyValue { level, value }
            }
            QueryError::InvalidTarget { target, .. } => GlycodashError::InvalidTarget(target),
            QueryError::MalformedResponse(detail) => GlycodashError::MalformedResponse(detail),
            QueryError::Service { status, body } => {
                GlycodashError::MalformedResponse(format!("HTTP {status}: {body}"))
            }
            QueryError::Http(e) => GlycodashError::Http(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_errors_stay_selection_errors() {
        let err = QueryError::InvalidTaxonomyValue {
            level: "Kingdom".into(),
            value: "Mars".into(),
        };
        assert!(err.is_selection_error());
        assert!(GlycodashError::from(err).is_selection_error());

        let err = QueryError::MalformedResponse("length mismatch".into());
        assert!(!err.is_selection_error());
        assert!(!GlycodashError::from(err).is_selection_error());
    }
}
