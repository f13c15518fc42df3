//! Login and OAuth2 redirect handlers.

use axum::extract::{Query, State};
use axum::response::Redirect;
use tracing::info;

use glycodash_auth::{AuthResult, RedirectParams};

use crate::error::ApiResult;
use crate::session::CurrentSession;
use crate::state::SharedState;

/// Where the callback sends the browser after a failed exchange. The page
/// shows a generic message; the reason stays in the logs.
pub const LOGIN_FAILED_REDIRECT: &str = "/?error=could_not_log_in";

/// GET /auth/login
pub async fn login(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
) -> ApiResult<Redirect> {
    let mut turn = session.turn().await;
    if turn.auth.is_authenticated() {
        return Ok(Redirect::to("/"));
    }
    match state.gateway.begin_login(&mut turn.auth)? {
        Some(url) => {
            info!(session_id = %session.id, "Redirecting to identity provider");
            Ok(Redirect::to(&url))
        }
        None => Ok(Redirect::to("/")),
    }
}

/// GET /auth/callback?code=..&state=..
pub async fn callback(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<RedirectParams>,
) -> Redirect {
    let mut turn = session.turn().await;
    let result = state
        .gateway
        .handle_redirect(&mut turn.auth, &params, || !session.is_closed())
        .await;

    match result {
        AuthResult::Authenticated { profile } => {
            info!(
                session_id = %session.id,
                user_id = %profile.display().user_id,
                "Session authenticated"
            );
            Redirect::to("/")
        }
        AuthResult::Failed { reason } => {
            info!(session_id = %session.id, reason, "Login failed");
            Redirect::to(LOGIN_FAILED_REDIRECT)
        }
        AuthResult::NotYetAuthenticated | AuthResult::Discarded => Redirect::to("/"),
    }
}
