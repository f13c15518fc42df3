//! Structural-context queries.
//!
//! A [`FilterSelection`] built from user input is validated against the
//! facet tables and dispatched to the external Context Analysis Service; the
//! response is checked and returned as a plot-ready [`ContextView`].

pub mod dispatcher;
pub mod error;
pub mod selection;
pub mod service;

pub use dispatcher::{BranchSplit, ContextView, QueryDispatcher};
pub use error::QueryError;
pub use selection::{BranchSelection, Criteria, FilterSelection, TaxonomyFilter, TaxonomyLevel, TaxonomyScope};
pub use service::{
    BranchRequest, BranchResponse, ContextAnalysisService, ContextRequest, ContextResponse,
    HttpContextService,
};
