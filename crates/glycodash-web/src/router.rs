//! Axum router — maps all URL paths to handlers.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    auth::{callback, login},
    context::{branch_chart, context_chart},
    data::{cache_status, dataset, facet_values, projection, summary},
    session::{close_session, index, session_info},
};
use crate::session::attach_session;
use crate::state::SharedState;

/// Build and return the full Axum router. The caller keeps its own handle on
/// `shared` for background tasks such as the idle sweeper.
pub fn build_router(shared: SharedState) -> Router {
    Router::new()
        .route("/",              get(index))
        .route("/auth/login",    get(login))
        .route("/auth/callback", get(callback))

        .route("/api/session",       get(session_info))
        .route("/api/session/close", post(close_session))

        .route("/api/dataset",            get(dataset))
        .route("/api/summary",            get(summary))
        .route("/api/cache",              get(cache_status))
        .route("/api/projections/{kind}", get(projection))
        .route("/api/facets/{facet}",     get(facet_values))

        .route("/api/context",          get(context_chart))
        .route("/api/context/branches", get(branch_chart))

        // Middleware
        .layer(middleware::from_fn_with_state(Arc::clone(&shared), attach_session))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
