//! Reference data views. All of them require an authenticated (or Guest)
//! session.

use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::sync::MutexGuard;

use glycodash_data::dataset::DISPLAY_COLUMNS;
use glycodash_data::{
    CacheKey, Facet, GlycanRecord, LoadStatus, ProjectionKind, ProjectionPoint,
};

use crate::error::{ApiError, ApiResult};
use crate::session::{CurrentSession, Session, SessionTurn};

/// Take the session's turn, refusing sessions that have not logged in.
pub(crate) async fn authenticated_turn(session: &Session) -> ApiResult<MutexGuard<'_, SessionTurn>> {
    let turn = session.turn().await;
    if !turn.auth.is_authenticated() {
        return Err(ApiError::Unauthenticated);
    }
    Ok(turn)
}

#[derive(Serialize)]
struct DatasetPage<'a> {
    columns: [&'static str; 5],
    reference_organism: &'a str,
    total: usize,
    records: &'a [GlycanRecord],
}

/// GET /api/dataset
pub async fn dataset(CurrentSession(session): CurrentSession) -> ApiResult<Response> {
    let turn = authenticated_turn(&session).await?;
    let dataset = turn.data.get_dataset().await?;
    Ok(Json(DatasetPage {
        columns: DISPLAY_COLUMNS,
        reference_organism: &dataset.reference_organism,
        total: dataset.len(),
        records: &dataset.records,
    })
    .into_response())
}

/// GET /api/summary
pub async fn summary(CurrentSession(session): CurrentSession) -> ApiResult<Response> {
    let turn = authenticated_turn(&session).await?;
    let summary = turn.data.get_summary().await?;
    Ok(Json(&*summary).into_response())
}

#[derive(Serialize)]
struct ProjectionPage<'a> {
    kind: ProjectionKind,
    points: &'a [ProjectionPoint],
}

/// GET /api/projections/{kind}
pub async fn projection(
    CurrentSession(session): CurrentSession,
    Path(kind): Path<String>,
) -> ApiResult<Response> {
    let kind: ProjectionKind = kind.parse().map_err(ApiError::BadRequest)?;
    let turn = authenticated_turn(&session).await?;
    let table = turn.data.get_projection(kind).await?;
    Ok(Json(ProjectionPage {
        kind: table.kind,
        points: &table.points,
    })
    .into_response())
}

#[derive(Serialize)]
struct FacetPage<'a> {
    facet: Facet,
    values: &'a [String],
}

/// GET /api/facets/{facet}
pub async fn facet_values(
    CurrentSession(session): CurrentSession,
    Path(facet): Path<String>,
) -> ApiResult<Response> {
    let facet: Facet = facet.parse().map_err(ApiError::BadRequest)?;
    let turn = authenticated_turn(&session).await?;
    let values = turn.data.get_facet_values(facet).await?;
    Ok(Json(FacetPage {
        facet,
        values: &values,
    })
    .into_response())
}

#[derive(Serialize)]
pub struct CacheEntry {
    pub key: String,
    pub status: LoadStatus,
}

/// GET /api/cache
///
/// Load status of every per-session cache entry, for the loading indicators.
pub async fn cache_status(CurrentSession(session): CurrentSession) -> ApiResult<Json<Vec<CacheEntry>>> {
    let turn = authenticated_turn(&session).await?;
    let keys = [CacheKey::Dataset, CacheKey::Facets, CacheKey::Summary]
        .into_iter()
        .chain(ProjectionKind::ALL.into_iter().map(CacheKey::Projection));
    let mut entries = Vec::new();
    for key in keys {
        entries.push(CacheEntry {
            key: key.to_string(),
            status: turn.data.status(key).await,
        });
    }
    Ok(Json(entries))
}
