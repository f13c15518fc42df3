//! Structural-context and branch-position charts.
//!
//! Invalid selections are not errors to the user: they render as an empty
//! chart with a warning, the same as choosing nothing.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use glycodash_context::{BranchSelection, BranchSplit, ContextView, FilterSelection, QueryError};

use crate::error::ApiResult;
use crate::handlers::data::authenticated_turn;
use crate::session::CurrentSession;
use crate::state::SharedState;

const CONTEXT_VIEW: &str = "context";
const BRANCH_VIEW: &str = "branches";

fn default_level() -> String {
    "Kingdom".to_string()
}

fn default_value() -> String {
    glycodash_context::selection::ALL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ContextParams {
    pub criteria: String,
    pub target: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_value")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct BranchParams {
    pub target: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_value")]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Chart<T> {
    #[serde(flatten)]
    pub view: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> Chart<T> {
    fn ok(view: T) -> Self {
        Self { view, warning: None }
    }
}

impl<T: Default> Chart<T> {
    fn empty(err: &QueryError) -> Self {
        Self {
            view: T::default(),
            warning: Some(err.to_string()),
        }
    }
}

/// Route selection errors to an empty chart; everything else is a real error.
fn render<T: Default>(result: Result<T, QueryError>) -> ApiResult<Json<Chart<T>>> {
    match result {
        Ok(view) => Ok(Json(Chart::ok(view))),
        Err(e) if e.is_selection_error() => {
            debug!(error = %e, "Selection rejected, rendering empty chart");
            Ok(Json(Chart::empty(&e)))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /api/context?criteria=..&target=..&level=..&value=..
pub async fn context_chart(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<ContextParams>,
) -> ApiResult<Json<Chart<ContextView>>> {
    let mut turn = authenticated_turn(&session).await?;
    let selection = match FilterSelection::from_raw(
        &params.criteria,
        &params.target,
        &params.level,
        &params.value,
    ) {
        Ok(selection) => selection,
        Err(e) => return render(Err(e)),
    };

    let facets = turn.data.get_facets().await?;
    let result = turn
        .context_views
        .get_or_compute(CONTEXT_VIEW, &selection, || {
            state.dispatcher.characterize(&selection, &facets)
        })
        .await;
    render(result)
}

/// GET /api/context/branches?target=..&level=..&value=..
pub async fn branch_chart(
    State(state): State<SharedState>,
    CurrentSession(session): CurrentSession,
    Query(params): Query<BranchParams>,
) -> ApiResult<Json<Chart<BranchSplit>>> {
    let mut turn = authenticated_turn(&session).await?;
    let selection = match BranchSelection::from_raw(&params.target, &params.level, &params.value) {
        Ok(selection) => selection,
        Err(e) => return render(Err(e)),
    };

    let facets = turn.data.get_facets().await?;
    let result = turn
        .branch_views
        .get_or_compute(BRANCH_VIEW, &selection, || {
            state.dispatcher.branch_split(&selection, &facets)
        })
        .await;
    render(result)
}
