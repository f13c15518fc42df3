//! Session lifecycle handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use glycodash_auth::SessionView;
use glycodash_common::SessionId;

use crate::session::{clear_session_cookie, CurrentSession};
use crate::state::SharedState;

const LOGIN_ERROR_MESSAGE: &str = "Could not log in. Please try again.";

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub app: &'static str,
    pub session: SessionView,
    pub login_error: Option<&'static str>,
}

/// GET /
pub async fn index(
    CurrentSession(session): CurrentSession,
    Query(params): Query<IndexParams>,
) -> Json<IndexPage> {
    let turn = session.turn().await;
    let view = turn.auth.view();
    let login_error = match (&params.error, view.authenticated) {
        (Some(_), false) => Some(LOGIN_ERROR_MESSAGE),
        _ => None,
    };
    Json(IndexPage {
        app: "glycodash",
        session: view,
        login_error,
    })
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub view: SessionView,
}

/// GET /api/session
pub async fn session_info(CurrentSession(session): CurrentSession) -> Json<SessionInfo> {
    let turn = session.turn().await;
    Json(SessionInfo {
        session_id: session.id,
        view: turn.auth.view(),
    })
}

/// POST /api/session/close
///
/// Explicit disconnect. Anything the session had in flight is discarded.
pub async fn close_session(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> impl IntoResponse {
    state.sessions.close(&session.id).await;
    (jar.remove(clear_session_cookie()), StatusCode::NO_CONTENT)
}
