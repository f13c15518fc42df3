use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Shown for profile fields the identity provider did not supply.
pub const UNKNOWN: &str = "unknown";

/// Opaque authorization code taken from the redirect query string.
///
/// Only constructible from a non-empty string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthCode(String);

impl AuthCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthCode([REDACTED])")
    }
}

/// Query parameters of the inbound OAuth2 redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Tokens owned by an authenticated session.
#[derive(Clone, Serialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub id_token: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl TokenBundle {
    pub(crate) fn from_response(response: TokenResponse) -> Option<Self> {
        if response.access_token.trim().is_empty() {
            return None;
        }
        Some(Self {
            access_token: response.access_token,
            id_token: response.id_token.filter(|t| !t.is_empty()),
            issued_at: Utc::now(),
        })
    }
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// User identity fetched once per session after the token exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub owner_id: Option<String>,
}

impl UserProfile {
    /// Synthetic profile for sessions that skip login.
    pub fn guest() -> Self {
        Self {
            user_id: Some("guest".to_string()),
            first_name: Some("Guest".to_string()),
            ..Self::default()
        }
    }

    /// Merge the userinfo and profile documents. Profile fields win where both
    /// answer; either document may be missing.
    pub fn from_documents(userinfo: Option<&JsonValue>, profile: Option<&JsonValue>) -> Self {
        let pick = |keys: &[&str]| {
            profile
                .and_then(|doc| field(doc, keys))
                .or_else(|| userinfo.and_then(|doc| field(doc, keys)))
        };
        Self {
            user_id: pick(&["userid", "userId", "user_id", "sub"]),
            first_name: pick(&["firstName", "first_name", "given_name"]),
            last_name: pick(&["lastName", "last_name", "family_name"]),
            email: pick(&["email"]),
            company: pick(&["company"]),
            owner_id: pick(&["ownerId", "owner_id"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn display(&self) -> DisplayProfile {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());
        DisplayProfile {
            user_id: show(&self.user_id),
            first_name: show(&self.first_name),
            last_name: show(&self.last_name),
            email: show(&self.email),
            company: show(&self.company),
            owner_id: show(&self.owner_id),
        }
    }
}

/// Profile with every field rendered, `"unknown"` standing in for gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub owner_id: String,
}

fn field(doc: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match doc.get(*key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_code_rejects_empty() {
        assert!(AuthCode::parse("").is_none());
        assert!(AuthCode::parse("   ").is_none());
        assert_eq!(AuthCode::parse("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_token_bundle_requires_access_token() {
        let empty = TokenResponse { access_token: String::new(), id_token: None };
        assert!(TokenBundle::from_response(empty).is_none());

        let ok = TokenResponse {
            access_token: "at".into(),
            id_token: Some("it".into()),
        };
        let bundle = TokenBundle::from_response(ok).unwrap();
        assert_eq!(bundle.access_token, "at");
        assert_eq!(bundle.id_token.as_deref(), Some("it"));
    }

    #[test]
    fn test_token_bundle_debug_is_redacted() {
        let bundle = TokenBundle::from_response(TokenResponse {
            access_token: "very-secret".into(),
            id_token: Some("also-secret".into()),
        })
        .unwrap();
        let rendered = format!("{bundle:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("also-secret"));
    }

    #[test]
    fn test_profile_merges_documents() {
        let userinfo = json!({"userid": "u-1", "email": "ada@example.org"});
        let profile = json!({"firstName": "Ada", "lastName": "Lovelace", "company": "", "ownerId": 42});
        let merged = UserProfile::from_documents(Some(&userinfo), Some(&profile));
        assert_eq!(merged.user_id.as_deref(), Some("u-1"));
        assert_eq!(merged.first_name.as_deref(), Some("Ada"));
        assert_eq!(merged.email.as_deref(), Some("ada@example.org"));
        assert_eq!(merged.company, None);
        assert_eq!(merged.owner_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_missing_fields_display_as_unknown() {
        let display = UserProfile::default().display();
        assert_eq!(display.first_name, UNKNOWN);
        assert_eq!(display.email, UNKNOWN);
    }

    #[test]
    fn test_guest_profile() {
        let guest = UserProfile::guest();
        assert_eq!(guest.display().first_name, "Guest");
        assert!(!guest.is_empty());
    }
}
