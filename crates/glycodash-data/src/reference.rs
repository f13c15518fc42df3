//! Process-wide reference data: the dataset, its facet tables and summary.
//!
//! Each is loaded at most once per process. Concurrent first callers share
//! one in-flight load; a failed load leaves the cell empty so the next caller
//! retries.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{error, info};

use glycodash_config::DataConfig;

use crate::dataset::{parse_dataset, Dataset};
use crate::error::{DataKind, DataLoadError};
use crate::facets::{parse_taxonomy, FacetTables};
use crate::projection::{parse_projection, ProjectionKind, ProjectionTable};
use crate::source::DataSource;
use crate::summary::{DatasetSummary, TOP_SPECIES};

/// File names within a release.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub dataset: String,
    pub taxonomy: String,
    pub structure_projection: String,
    pub word_projection: String,
    pub letter_projection: String,
}

impl DataFiles {
    pub fn from_config(config: &DataConfig) -> Self {
        Self {
            dataset: config.dataset_file.clone(),
            taxonomy: config.taxonomy_file.clone(),
            structure_projection: config.structure_projection_file.clone(),
            word_projection: config.word_projection_file.clone(),
            letter_projection: config.letter_projection_file.clone(),
        }
    }

    pub fn projection(&self, kind: ProjectionKind) -> &str {
        match kind {
            ProjectionKind::Structure => &self.structure_projection,
            ProjectionKind::Word => &self.word_projection,
            ProjectionKind::Letter => &self.letter_projection,
        }
    }
}

pub struct ReferenceStore {
    source: Arc<dyn DataSource>,
    files: DataFiles,
    reference_organism: String,
    dataset: OnceCell<Arc<Dataset>>,
    facets: OnceCell<Arc<FacetTables>>,
    summary: OnceCell<Arc<DatasetSummary>>,
}

impl ReferenceStore {
    pub fn new(source: Arc<dyn DataSource>, files: DataFiles, reference_organism: impl Into<String>) -> Self {
        Self {
            source,
            files,
            reference_organism: reference_organism.into(),
            dataset: OnceCell::new(),
            facets: OnceCell::new(),
            summary: OnceCell::new(),
        }
    }

    pub fn from_config(source: Arc<dyn DataSource>, config: &DataConfig) -> Self {
        Self::new(source, DataFiles::from_config(config), config.reference_organism.clone())
    }

    /// The normalized dataset.
    pub async fn dataset(&self) -> Result<Arc<Dataset>, DataLoadError> {
        self.dataset
            .get_or_try_init(|| async {
                let started = Instant::now();
                let bytes = self.fetch(DataKind::Dataset, &self.files.dataset).await?;
                let dataset = parse_dataset(&bytes, &self.reference_organism)?;
                info!(
                    records = dataset.len(),
                    reference = dataset.reference_count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Loaded reference dataset"
                );
                Ok(Arc::new(dataset))
            })
            .await
            .cloned()
            .inspect_err(|e| error!(error = %e, "Dataset load failed"))
    }

    pub async fn facets(&self) -> Result<Arc<FacetTables>, DataLoadError> {
        self.facets
            .get_or_try_init(|| async {
                let dataset = self.dataset().await?;
                let bytes = self.fetch(DataKind::Taxonomy, &self.files.taxonomy).await?;
                let taxonomy = parse_taxonomy(&bytes)?;
                let facets = FacetTables::build(&dataset, &taxonomy);
                info!(taxonomy_rows = taxonomy.len(), "Built facet tables");
                Ok(Arc::new(facets))
            })
            .await
            .cloned()
    }

    pub async fn summary(&self) -> Result<Arc<DatasetSummary>, DataLoadError> {
        self.summary
            .get_or_try_init(|| async {
                let dataset = self.dataset().await?;
                Ok(Arc::new(DatasetSummary::from_dataset(&dataset, TOP_SPECIES)))
            })
            .await
            .cloned()
    }

    /// Read and parse one projection file. Not memoized here: projections are
    /// cached per session by [`SessionDataStore`](crate::SessionDataStore).
    pub async fn load_projection(&self, kind: ProjectionKind) -> Result<ProjectionTable, DataLoadError> {
        let bytes = self
            .fetch(DataKind::Projection(kind), self.files.projection(kind))
            .await?;
        let table = parse_projection(kind, &bytes)?;
        info!(kind = %kind, points = table.len(), "Loaded projection table");
        Ok(table)
    }

    /// Load everything shared so the first session does not pay for it.
    pub async fn warm(&self) -> Result<(), DataLoadError> {
        self.facets().await?;
        self.summary().await?;
        Ok(())
    }

    async fn fetch(&self, kind: DataKind, file: &str) -> Result<Vec<u8>, DataLoadError> {
        self.source
            .fetch(file)
            .await
            .map_err(|e| DataLoadError::new(kind, e))
    }
}
