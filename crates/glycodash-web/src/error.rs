//! HTTP error mapping.
//!
//! Component errors are folded into [`GlycodashError`] on the way out; the
//! response status follows its variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use glycodash_auth::AuthError;
use glycodash_common::GlycodashError;
use glycodash_context::QueryError;
use glycodash_data::DataLoadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login required")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Domain(#[from] GlycodashError),

    #[error("request reached a handler without a session")]
    NoSession,
}

impl From<DataLoadError> for ApiError {
    fn from(err: DataLoadError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Domain(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Domain(e) if e.is_selection_error() => StatusCode::BAD_REQUEST,
            Self::Domain(e) => match e {
                GlycodashError::DataLoad { .. } => StatusCode::SERVICE_UNAVAILABLE,
                GlycodashError::MalformedResponse(_) | GlycodashError::Http(_) => {
                    StatusCode::BAD_GATEWAY
                }
                GlycodashError::AuthFailed { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %self, status = status.as_u16(), "Request rejected");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
