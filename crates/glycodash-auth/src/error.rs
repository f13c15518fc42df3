use glycodash_common::GlycodashError;

/// Failures of the login flow.
///
/// Every variant maps to a short, stable reason code via [`AuthError::reason`];
/// only that code ever reaches the user-facing layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Token endpoint answered with a non-2xx status or an unusable body.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The identity provider did not answer within the HTTP timeout.
    #[error("Identity provider timed out")]
    Timeout,

    /// The authorization code was already presented once in this session.
    #[error("Authorization code already used")]
    CodeAlreadyUsed,

    /// The `state` returned on the redirect does not match the one issued.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Userinfo or profile request failed.
    #[error("Identity request failed ({operation}): {detail}")]
    Identity {
        operation: &'static str,
        detail: String,
    },

    /// The requested transition is not valid from the current state.
    #[error("Invalid auth transition: {0}")]
    InvalidTransition(&'static str),

    /// Missing or unparseable gateway settings.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// Stable reason code recorded on the session and surfaced to the user.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TokenExchange(_) => "token_exchange_failed",
            Self::Timeout => "timeout",
            Self::CodeAlreadyUsed => "code_already_used",
            Self::StateMismatch => "state_mismatch",
            Self::Identity { .. } => "identity_fetch_failed",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Config(_) => "config",
            Self::Http(e) if e.is_timeout() => "timeout",
            Self::Http(_) => "token_exchange_failed",
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl From<AuthError> for GlycodashError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Config(msg) => GlycodashError::Config(msg),
            other => GlycodashError::AuthFailed {
                reason: other.reason().to_string(),
            },
        }
    }
}
