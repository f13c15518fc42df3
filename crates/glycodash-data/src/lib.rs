//! Glycodash reference data.
//!
//! The glycan dataset, facet tables and summary are loaded once per process
//! by [`ReferenceStore`]; each session reads them, and its own projection
//! tables, through a [`SessionDataStore`].

pub mod dataset;
pub mod error;
pub mod facets;
pub mod memo;
pub mod projection;
pub mod reference;
pub mod source;
pub mod store;
pub mod summary;

pub use dataset::{
    normalize_species, parse_dataset, partition_reference_first, recode_immunogenic, recode_link,
    Dataset, GlycanRecord, Immunogenicity, LinkType,
};
pub use error::{DataKind, DataLoadError, SourceError};
pub use facets::{parse_taxonomy, tokenize_structure, Facet, FacetTables, TaxonomyRow};
pub use memo::ViewMemo;
pub use projection::{parse_projection, ProjectionKind, ProjectionPoint, ProjectionTable};
pub use reference::{DataFiles, ReferenceStore};
pub use source::{source_from_config, DataSource, LocalDirSource, ReleaseSource};
pub use store::{CacheKey, LoadStatus, SessionDataStore};
pub use summary::DatasetSummary;
