use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use glycodash_data::FacetTables;

use crate::error::QueryError;
use crate::selection::{BranchSelection, FilterSelection, TaxonomyScope};
use crate::service::{BranchRequest, ContextAnalysisService, ContextRequest};

/// Plot-ready context chart. `labels[i]` pairs with `counts[i]`, in the order
/// the service returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextView {
    pub title: String,
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl ContextView {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Occurrences of a glycoletter on the main chain versus side branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BranchSplit {
    pub main: u64,
    pub side: u64,
}

impl BranchSplit {
    pub const LABELS: [&'static str; 2] = ["Main", "Side"];

    pub fn counts(self) -> [u64; 2] {
        [self.main, self.side]
    }
}

/// Turns validated selections into context service calls.
///
/// Reads facet tables for validation only; never touches session caches.
#[derive(Clone)]
pub struct QueryDispatcher {
    service: Arc<dyn ContextAnalysisService>,
}

impl QueryDispatcher {
    pub fn new(service: Arc<dyn ContextAnalysisService>) -> Self {
        Self { service }
    }

    /// # Errors
    ///
    /// Selection errors ([`QueryError::is_selection_error`]) when the input
    /// does not validate against `facets`; service or malformed-response
    /// errors otherwise.
    pub async fn characterize(
        &self,
        selection: &FilterSelection,
        facets: &FacetTables,
    ) -> Result<ContextView, QueryError> {
        selection.validate(facets)?;

        let request = ContextRequest {
            glycoletter: selection.target.clone(),
            mode: selection.criteria.service_mode(),
            taxonomy_filter: selection.scope.level.as_str(),
            taxonomy_value: selection.scope.filter.as_str().to_string(),
        };
        debug!(
            target_label = %request.glycoletter,
            mode = request.mode,
            scope = %selection.scope,
            "Dispatching context query"
        );
        let response = self.service.characterize_context(&request).await?;

        if response.labels.len() != response.counts.len() {
            warn!(
                labels = response.labels.len(),
                counts = response.counts.len(),
                "Context service returned mismatched arrays"
            );
            return Err(QueryError::MalformedResponse(format!(
                "{} labels but {} counts",
                response.labels.len(),
                response.counts.len()
            )));
        }

        let title = if response.title.trim().is_empty() {
            selection.title()
        } else {
            response.title
        };
        Ok(ContextView {
            title,
            labels: response.labels,
            counts: response.counts,
        })
    }

    pub async fn branch_split(
        &self,
        selection: &BranchSelection,
        facets: &FacetTables,
    ) -> Result<BranchSplit, QueryError> {
        selection.validate(facets)?;

        let TaxonomyScope { level, filter } = &selection.scope;
        let request = BranchRequest {
            glycoletter: selection.target.clone(),
            taxonomy_filter: level.as_str(),
            taxonomy_value: filter.as_str().to_string(),
        };
        let response = self.service.main_vs_side_branch(&request).await?;
        Ok(BranchSplit {
            main: response.main,
            side: response.side,
        })
    }
}
