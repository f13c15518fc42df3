//! glycodash-auth — OAuth2 authentication gateway.
//!
//! Turns an inbound authorization code into a validated user session:
//!   - builds the identity-provider authorize URL
//!   - accepts the redirect and consumes the code exactly once
//!   - exchanges the code for tokens (HTTP Basic client credentials)
//!   - fetches the user profile, tolerating failure of that secondary fetch
//!   - short-circuits to a Guest session when login is not required

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod state;
pub mod state_param;
pub mod types;

pub use client::OAuthClient;
pub use diagnostics::DiagnosticCache;
pub use error::AuthError;
pub use gateway::{AuthGateway, AuthResult};
pub use state::{AuthState, SessionAuth, SessionView};
pub use types::{AuthCode, DisplayProfile, RedirectParams, TokenBundle, UserProfile};
