//! Per-session authentication state machine.
//!
//! ```text
//! Anonymous → AwaitingRedirect → CodeReceived → TokenExchangePending → Authenticated
//! ```
//!
//! Every transition here is pure; network calls live in the gateway. A failed
//! transition records its reason and returns the session to `Anonymous` so the
//! user can start the login again. `Bypassed` is not reached by a transition:
//! it is the initial state of sessions created with login switched off.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::AuthError;
use crate::types::{AuthCode, DisplayProfile, RedirectParams, TokenBundle, UserProfile};

#[derive(Debug, Clone)]
pub enum AuthState {
    Anonymous,
    AwaitingRedirect { state: String },
    CodeReceived { code: AuthCode },
    TokenExchangePending,
    Authenticated { tokens: TokenBundle, profile: UserProfile },
    Bypassed { profile: UserProfile },
}

impl AuthState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::AwaitingRedirect { .. } => "awaiting_redirect",
            Self::CodeReceived { .. } => "code_received",
            Self::TokenExchangePending => "token_exchange_pending",
            Self::Authenticated { .. } => "authenticated",
            Self::Bypassed { .. } => "bypassed",
        }
    }
}

/// Authentication record owned by one session.
#[derive(Debug)]
pub struct SessionAuth {
    state: AuthState,
    consumed_codes: HashSet<AuthCode>,
    last_failure: Option<&'static str>,
}

/// Read-only snapshot for the user-facing layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub state: &'static str,
    pub authenticated: bool,
    pub guest: bool,
    pub profile: Option<DisplayProfile>,
    pub last_failure: Option<&'static str>,
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuth {
    pub fn new() -> Self {
        Self {
            state: AuthState::Anonymous,
            consumed_codes: HashSet::new(),
            last_failure: None,
        }
    }

    /// Session created with login switched off: Guest from the start.
    pub fn bypassed() -> Self {
        Self {
            state: AuthState::Bypassed { profile: UserProfile::guest() },
            ..Self::new()
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Tokens exist exactly when the state is `Authenticated`.
    pub fn tokens(&self) -> Option<&TokenBundle> {
        match &self.state {
            AuthState::Authenticated { tokens, .. } => Some(tokens),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            AuthState::Authenticated { profile, .. } | AuthState::Bypassed { profile } => {
                Some(profile)
            }
            _ => None,
        }
    }

    /// Whether data views may be served to this session.
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            AuthState::Authenticated { .. } | AuthState::Bypassed { .. }
        )
    }

    pub fn last_failure(&self) -> Option<&'static str> {
        self.last_failure
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state.name(),
            authenticated: self.is_authenticated(),
            guest: matches!(self.state, AuthState::Bypassed { .. }),
            profile: self.profile().map(UserProfile::display),
            last_failure: self.last_failure,
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// `Anonymous → AwaitingRedirect`. Re-issuing a login while already
    /// awaiting the redirect replaces the pending `state`.
    pub fn begin_login(&mut self, state: String) -> Result<(), AuthError> {
        match self.state {
            AuthState::Anonymous | AuthState::AwaitingRedirect { .. } => {
                self.state = AuthState::AwaitingRedirect { state };
                Ok(())
            }
            AuthState::Authenticated { .. } | AuthState::Bypassed { .. } => {
                Err(AuthError::InvalidTransition("session already authenticated"))
            }
            AuthState::CodeReceived { .. } | AuthState::TokenExchangePending => {
                Err(AuthError::InvalidTransition("token exchange in progress"))
            }
        }
    }

    /// Accept the inbound redirect.
    ///
    /// Returns `Ok(None)` when there is nothing to exchange: no `code` on the
    /// request (the session stays anonymous) or a fresh code reaching an
    /// already authenticated session. A code is consumed here, before any
    /// exchange is attempted, so a second presentation fails even if the
    /// first exchange failed. Replaying a consumed code on an authenticated
    /// session fails too, but leaves the session authenticated.
    pub fn receive_redirect(
        &mut self,
        params: &RedirectParams,
    ) -> Result<Option<AuthCode>, AuthError> {
        let code = params.code.as_deref().and_then(AuthCode::parse);

        if self.is_authenticated() {
            return match code {
                Some(code) if self.consumed_codes.contains(&code) => Err(AuthError::CodeAlreadyUsed),
                _ => Ok(None),
            };
        }
        if matches!(
            self.state,
            AuthState::CodeReceived { .. } | AuthState::TokenExchangePending
        ) {
            return Err(self.fail(AuthError::InvalidTransition("token exchange in progress")));
        }

        let Some(code) = code else {
            self.state = AuthState::Anonymous;
            return Ok(None);
        };

        if self.consumed_codes.contains(&code) {
            return Err(self.fail(AuthError::CodeAlreadyUsed));
        }

        let state_mismatch = match (&self.state, params.state.as_deref()) {
            (AuthState::AwaitingRedirect { state: expected }, Some(received)) => {
                expected != received
            }
            _ => false,
        };
        if state_mismatch {
            self.consumed_codes.insert(code);
            return Err(self.fail(AuthError::StateMismatch));
        }

        self.consumed_codes.insert(code.clone());
        self.state = AuthState::CodeReceived { code: code.clone() };
        Ok(Some(code))
    }

    /// `CodeReceived → TokenExchangePending`.
    pub fn begin_exchange(&mut self) -> Result<AuthCode, AuthError> {
        match std::mem::replace(&mut self.state, AuthState::TokenExchangePending) {
            AuthState::CodeReceived { code } => Ok(code),
            previous => {
                self.state = previous;
                Err(AuthError::InvalidTransition("no authorization code received"))
            }
        }
    }

    /// `TokenExchangePending → Authenticated`.
    pub fn complete_exchange(&mut self, tokens: TokenBundle) -> Result<(), AuthError> {
        if !matches!(self.state, AuthState::TokenExchangePending) {
            return Err(AuthError::InvalidTransition("no token exchange pending"));
        }
        self.state = AuthState::Authenticated {
            tokens,
            profile: UserProfile::default(),
        };
        self.last_failure = None;
        Ok(())
    }

    /// Attach the profile fetched after the exchange. Ignored unless authenticated.
    pub fn attach_profile(&mut self, fetched: UserProfile) {
        if let AuthState::Authenticated { profile, .. } = &mut self.state {
            *profile = fetched;
        }
    }

    /// Record a failure and return the session to `Anonymous`.
    pub fn fail(&mut self, err: AuthError) -> AuthError {
        self.last_failure = Some(err.reason());
        self.state = AuthState::Anonymous;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn redirect(code: Option<&str>, state: Option<&str>) -> RedirectParams {
        RedirectParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
        }
    }

    fn tokens() -> TokenBundle {
        TokenBundle {
            access_token: "access".into(),
            id_token: Some("id".into()),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_session_is_anonymous_without_tokens() {
        let auth = SessionAuth::new();
        assert!(matches!(auth.state(), AuthState::Anonymous));
        assert!(auth.tokens().is_none());
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_full_happy_path() {
        let mut auth = SessionAuth::new();
        auth.begin_login("s1".into()).unwrap();
        let code = auth
            .receive_redirect(&redirect(Some("c1"), Some("s1")))
            .unwrap()
            .unwrap();
        assert_eq!(code.as_str(), "c1");
        assert_eq!(auth.begin_exchange().unwrap(), code);
        assert!(matches!(auth.state(), AuthState::TokenExchangePending));
        auth.complete_exchange(tokens()).unwrap();
        assert!(auth.is_authenticated());
        assert!(auth.tokens().is_some());
    }

    #[test]
    fn test_missing_code_stays_anonymous() {
        let mut auth = SessionAuth::new();
        auth.begin_login("s1".into()).unwrap();
        assert!(auth.receive_redirect(&redirect(None, None)).unwrap().is_none());
        assert!(matches!(auth.state(), AuthState::Anonymous));
        assert!(auth.last_failure().is_none());
    }

    #[test]
    fn test_empty_code_is_treated_as_missing() {
        let mut auth = SessionAuth::new();
        assert!(auth.receive_redirect(&redirect(Some(""), None)).unwrap().is_none());
        assert!(matches!(auth.state(), AuthState::Anonymous));
    }

    #[test]
    fn test_code_reuse_fails() {
        let mut auth = SessionAuth::new();
        auth.receive_redirect(&redirect(Some("c1"), None)).unwrap();
        auth.begin_exchange().unwrap();
        auth.fail(AuthError::TokenExchange("400".into()));

        let err = auth.receive_redirect(&redirect(Some("c1"), None)).unwrap_err();
        assert!(matches!(err, AuthError::CodeAlreadyUsed));
        assert_eq!(auth.last_failure(), Some("code_already_used"));
        assert!(matches!(auth.state(), AuthState::Anonymous));
        assert!(auth.tokens().is_none());
    }

    #[test]
    fn test_state_mismatch_consumes_code() {
        let mut auth = SessionAuth::new();
        auth.begin_login("expected".into()).unwrap();
        let err = auth
            .receive_redirect(&redirect(Some("c1"), Some("forged")))
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
        assert!(matches!(auth.state(), AuthState::Anonymous));

        let err = auth.receive_redirect(&redirect(Some("c1"), None)).unwrap_err();
        assert!(matches!(err, AuthError::CodeAlreadyUsed));
    }

    #[test]
    fn test_absent_state_is_tolerated() {
        let mut auth = SessionAuth::new();
        auth.begin_login("expected".into()).unwrap();
        assert!(auth.receive_redirect(&redirect(Some("c1"), None)).unwrap().is_some());
    }

    #[test]
    fn test_failure_returns_to_anonymous_and_allows_retry() {
        let mut auth = SessionAuth::new();
        auth.receive_redirect(&redirect(Some("c1"), None)).unwrap();
        auth.begin_exchange().unwrap();
        auth.fail(AuthError::TokenExchange("500".into()));
        assert!(matches!(auth.state(), AuthState::Anonymous));
        assert_eq!(auth.last_failure(), Some("token_exchange_failed"));
        auth.begin_login("s2".into()).unwrap();
        assert!(matches!(auth.state(), AuthState::AwaitingRedirect { .. }));
    }

    #[test]
    fn test_authenticated_is_terminal() {
        let mut auth = SessionAuth::new();
        auth.receive_redirect(&redirect(Some("c1"), None)).unwrap();
        auth.begin_exchange().unwrap();
        auth.complete_exchange(tokens()).unwrap();

        assert!(auth.begin_login("again".into()).is_err());
        assert!(auth.receive_redirect(&redirect(Some("c2"), None)).unwrap().is_none());
        assert!(auth.is_authenticated());
    }

    #[test]
    fn test_replayed_code_after_login_fails_but_keeps_session() {
        let mut auth = SessionAuth::new();
        auth.receive_redirect(&redirect(Some("c1"), None)).unwrap();
        auth.begin_exchange().unwrap();
        auth.complete_exchange(tokens()).unwrap();

        let err = auth.receive_redirect(&redirect(Some("c1"), None)).unwrap_err();
        assert_eq!(err.reason(), "code_already_used");
        assert!(auth.is_authenticated());
        assert!(auth.tokens().is_some());
        assert_eq!(auth.last_failure(), None);
    }

    #[test]
    fn test_exchange_requires_code() {
        let mut auth = SessionAuth::new();
        assert!(auth.begin_exchange().is_err());
        assert!(matches!(auth.state(), AuthState::Anonymous));
        assert!(auth.complete_exchange(tokens()).is_err());
        assert!(auth.tokens().is_none());
    }

    #[test]
    fn test_bypassed_session_is_guest() {
        let auth = SessionAuth::bypassed();
        assert!(auth.is_authenticated());
        assert!(auth.tokens().is_none());
        let view = auth.view();
        assert!(view.guest);
        assert_eq!(view.profile.unwrap().first_name, "Guest");
    }

    #[test]
    fn test_profile_attached_after_exchange() {
        let mut auth = SessionAuth::new();
        auth.receive_redirect(&redirect(Some("c1"), None)).unwrap();
        auth.begin_exchange().unwrap();
        auth.complete_exchange(tokens()).unwrap();
        auth.attach_profile(UserProfile {
            first_name: Some("Ada".into()),
            ..UserProfile::default()
        });
        let view = auth.view();
        assert_eq!(view.state, "authenticated");
        let profile = view.profile.unwrap();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "unknown");
    }
}
