use std::fmt;

use serde::Serialize;
use thiserror::Error;

use glycodash_common::GlycodashError;

use crate::projection::ProjectionKind;

/// Which reference source a load was reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Dataset,
    Taxonomy,
    Projection(ProjectionKind),
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => f.write_str("dataset"),
            Self::Taxonomy => f.write_str("taxonomy"),
            Self::Projection(kind) => write!(f, "projection:{kind}"),
        }
    }
}

/// A reference file or projection could not be read or parsed.
///
/// Cloneable so that a failed load can be reported to every consumer that was
/// waiting on it and recorded in the load status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to load {kind}: {cause}")]
pub struct DataLoadError {
    pub kind: DataKind,
    pub cause: String,
}

impl DataLoadError {
    pub fn new(kind: DataKind, cause: impl fmt::Display) -> Self {
        Self {
            kind,
            cause: cause.to_string(),
        }
    }
}

impl From<DataLoadError> for GlycodashError {
    fn from(err: DataLoadError) -> Self {
        GlycodashError::DataLoad {
            kind: err.kind.to_string(),
            cause: err.cause,
        }
    }
}

/// Failure of a [`DataSource`](crate::source::DataSource) fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(DataKind::Dataset.to_string(), "dataset");
        assert_eq!(
            DataKind::Projection(ProjectionKind::Letter).to_string(),
            "projection:letter"
        );
    }

    #[test]
    fn test_converts_into_shared_taxonomy() {
        let err = DataLoadError::new(DataKind::Projection(ProjectionKind::Word), "missing column");
        let shared: GlycodashError = err.into();
        assert_eq!(
            shared.to_string(),
            "Failed to load projection:word: missing column"
        );
    }
}
