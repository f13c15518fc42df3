use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use glycodash_config::AuthConfig;

use crate::error::AuthError;
use crate::types::{AuthCode, TokenBundle, TokenResponse};

/// HTTP client for the identity provider's authorize, token, userinfo and
/// profile endpoints.
pub struct OAuthClient {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
    scope: String,
    authorize_url: Url,
    token_url: Url,
    userinfo_url: Url,
    profile_url: Url,
    http: reqwest::Client,
}

fn endpoint(base: &str, path: &str) -> Result<Url, AuthError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| AuthError::Config(format!("{joined}: {e}")))
}

impl OAuthClient {
    /// Build the client from the `[auth]` section.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a required setting is missing or a URL
    /// does not parse.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let base = config
            .identity_provider_base_url
            .as_deref()
            .ok_or_else(|| AuthError::Config("identity_provider_base_url is required".into()))?;
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::Config("client_id is required".into()))?;
        let client_secret = config
            .client_secret
            .as_ref()
            .map(|s| SecretString::new(s.expose_secret().into()))
            .ok_or_else(|| AuthError::Config("client_secret is required".into()))?;
        let redirect_uri = config
            .redirect_uri
            .as_deref()
            .ok_or_else(|| AuthError::Config("redirect_uri is required".into()))?
            .parse::<Url>()
            .map_err(|e| AuthError::Config(format!("redirect_uri: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            scope: config.scope.clone(),
            authorize_url: endpoint(base, &config.authorize_path)?,
            token_url: endpoint(base, &config.token_path)?,
            userinfo_url: endpoint(base, &config.userinfo_path)?,
            profile_url: endpoint(base, &config.profile_path)?,
            http,
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Authorize URL the client is sent to. No network call.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scope)
            .append_pair("response_type", "code")
            .append_pair("state", state);
        url.into()
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The request is a form-encoded POST with an empty body; the grant
    /// parameters travel in the query string and the client credentials as
    /// HTTP Basic authentication. Any 2xx status is success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Timeout`] on timeout, [`AuthError::TokenExchange`]
    /// on a non-2xx status or a body without an access token.
    pub async fn exchange_code(&self, code: &AuthCode) -> Result<TokenBundle, AuthError> {
        let params = [
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url.clone())
            .query(&params)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Token endpoint rejected the code");
            return Err(AuthError::TokenExchange(format!("HTTP {status}: {body}")));
        }
        debug!(status = status.as_u16(), "Token endpoint accepted the code");

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("unreadable token response: {e}")))?;
        TokenBundle::from_response(body)
            .ok_or_else(|| AuthError::TokenExchange("empty access token".into()))
    }

    /// Fetch the userinfo document.
    pub async fn get_user_info(&self, access_token: &str) -> Result<JsonValue, AuthError> {
        self.get_identity(&self.userinfo_url, access_token, "userinfo").await
    }

    /// Fetch the profile document.
    pub async fn get_profile(&self, access_token: &str) -> Result<JsonValue, AuthError> {
        self.get_identity(&self.profile_url, access_token, "profile").await
    }

    async fn get_identity(
        &self,
        url: &Url,
        access_token: &str,
        operation: &'static str,
    ) -> Result<JsonValue, AuthError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(AuthError::from_transport)?;

        let response = Self::ensure_success(response, operation).await?;
        response.json::<JsonValue>().await.map_err(|e| AuthError::Identity {
            operation,
            detail: e.to_string(),
        })
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Identity {
            operation,
            detail: format!("HTTP {status}: {body}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            identity_provider_base_url: Some("https://id.example.org/oauth/".into()),
            client_id: Some("test-client".into()),
            client_secret: Some(SecretString::new("secret".into())),
            redirect_uri: Some("https://glycodash.example.org/auth/callback".into()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = OAuthClient::from_config(&test_config()).unwrap();
        let url = Url::parse(&client.authorization_url("xyz")).unwrap();

        assert_eq!(url.path(), "/oauth/authorize");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("client_id".to_string(), "test-client".to_string()),
                (
                    "redirect_uri".to_string(),
                    "https://glycodash.example.org/auth/callback".to_string()
                ),
                ("scope".to_string(), "openid profile email".to_string()),
                ("response_type".to_string(), "code".to_string()),
                ("state".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_client_id_is_config_error() {
        let config = AuthConfig {
            client_id: None,
            ..test_config()
        };
        assert!(matches!(
            OAuthClient::from_config(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_join_handles_slashes() {
        let url = endpoint("https://id.example.org/base/", "/token").unwrap();
        assert_eq!(url.as_str(), "https://id.example.org/base/token");
        let url = endpoint("https://id.example.org/base", "token").unwrap();
        assert_eq!(url.as_str(), "https://id.example.org/base/token");
    }
}
