use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use glycodash_config::Config;

use crate::client::OAuthClient;
use crate::diagnostics::DiagnosticCache;
use crate::error::AuthError;
use crate::state::SessionAuth;
use crate::state_param;
use crate::types::{RedirectParams, TokenBundle, UserProfile};

/// Outcome of handling one inbound redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthResult {
    Authenticated { profile: UserProfile },
    /// No code on the request, or the session was already authenticated.
    NotYetAuthenticated,
    Failed { reason: &'static str },
    /// The session disconnected while the exchange was in flight.
    Discarded,
}

/// Drives the OAuth2 authorization-code flow for every session.
///
/// When login is not required, or the process runs offline, the gateway holds
/// no client at all and every session starts as Guest.
pub struct AuthGateway {
    client: Option<OAuthClient>,
    diagnostics: DiagnosticCache,
}

impl AuthGateway {
    /// Build the gateway for this process. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when login is required and the `[auth]`
    /// section is incomplete.
    pub fn from_config(config: &Config) -> Result<Self, AuthError> {
        if config.auth_bypassed() {
            info!(
                require_login = config.require_login,
                offline_mode = config.offline_mode,
                "Login bypassed, sessions start as Guest"
            );
            return Ok(Self::bypassed());
        }
        let client = OAuthClient::from_config(&config.auth)?;
        Ok(Self::new(client, DiagnosticCache::from_config(config)))
    }

    pub fn new(client: OAuthClient, diagnostics: DiagnosticCache) -> Self {
        Self {
            client: Some(client),
            diagnostics,
        }
    }

    pub fn bypassed() -> Self {
        Self {
            client: None,
            diagnostics: DiagnosticCache::disabled(),
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.client.is_none()
    }

    /// Initial auth record for a newly connected session.
    pub fn new_session(&self) -> SessionAuth {
        if self.is_bypassed() {
            SessionAuth::bypassed()
        } else {
            SessionAuth::new()
        }
    }

    /// Login action: `Anonymous → AwaitingRedirect`.
    ///
    /// Returns the authorize URL to navigate to, or `None` when there is no
    /// login to perform (bypassed).
    pub fn begin_login(&self, auth: &mut SessionAuth) -> Result<Option<String>, AuthError> {
        let Some(client) = &self.client else {
            return Ok(None);
        };
        let state = state_param::generate_state();
        let url = client.authorization_url(&state);
        auth.begin_login(state)?;
        Ok(Some(url))
    }

    /// Handle the inbound redirect end to end.
    ///
    /// `still_connected` is checked after every suspension point; once it
    /// reports `false` the result is discarded without touching `auth`.
    pub async fn handle_redirect<F>(
        &self,
        auth: &mut SessionAuth,
        params: &RedirectParams,
        still_connected: F,
    ) -> AuthResult
    where
        F: Fn() -> bool,
    {
        let Some(client) = &self.client else {
            return AuthResult::NotYetAuthenticated;
        };

        let code = match auth.receive_redirect(params) {
            Ok(Some(code)) => code,
            Ok(None) => return AuthResult::NotYetAuthenticated,
            Err(e) => {
                warn!(error = %e, "Redirect rejected");
                return AuthResult::Failed { reason: e.reason() };
            }
        };

        if let Err(e) = auth.begin_exchange() {
            return AuthResult::Failed { reason: auth.fail(e).reason() };
        }

        let exchanged = client.exchange_code(&code).await;
        if !still_connected() {
            info!("Session closed during token exchange, discarding result");
            return AuthResult::Discarded;
        }

        let tokens = match exchanged {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(error = %e, "Token exchange failed");
                return AuthResult::Failed { reason: auth.fail(e).reason() };
            }
        };

        self.diagnostics.record("token", &tokens).await;
        let profile = self.fetch_profile(client, &tokens).await;
        if !still_connected() {
            info!("Session closed during profile fetch, discarding result");
            return AuthResult::Discarded;
        }

        if let Err(e) = auth.complete_exchange(tokens) {
            return AuthResult::Failed { reason: auth.fail(e).reason() };
        }
        auth.attach_profile(profile.clone());

        info!(
            user_id = profile.user_id.as_deref().unwrap_or("unknown"),
            "OAuth2 login successful"
        );
        AuthResult::Authenticated { profile }
    }

    /// Fetch userinfo and profile concurrently. Failures leave fields empty;
    /// they never revert the authentication.
    async fn fetch_profile(&self, client: &OAuthClient, tokens: &TokenBundle) -> UserProfile {
        let (userinfo, profile) = tokio::join!(
            client.get_user_info(&tokens.access_token),
            client.get_profile(&tokens.access_token),
        );

        let userinfo = userinfo
            .map_err(|e| warn!(error = %e, "Userinfo request failed"))
            .ok();
        let profile = profile
            .map_err(|e| warn!(error = %e, "Profile request failed"))
            .ok();

        self.diagnostics
            .record("identity", &json!({ "userinfo": userinfo, "profile": profile }))
            .await;

        UserProfile::from_documents(userinfo.as_ref(), profile.as_ref())
    }
}
