//! Per-session lazy cache over the shared reference data.
//!
//! Every key (dataset, facets, summary, one per projection kind) is populated
//! at most once per session. Population is an atomic check-then-set through
//! [`OnceCell::get_or_try_init`]: concurrent first requests wait on the same
//! load and all receive the same `Arc`. A failed load leaves the key unset.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::error::DataLoadError;
use crate::facets::{Facet, FacetTables};
use crate::projection::{ProjectionKind, ProjectionTable};
use crate::reference::ReferenceStore;
use crate::summary::DatasetSummary;

/// Identifies one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKey {
    Dataset,
    Facets,
    Summary,
    Projection(ProjectionKind),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => f.write_str("dataset"),
            Self::Facets => f.write_str("facets"),
            Self::Summary => f.write_str("summary"),
            Self::Projection(kind) => write!(f, "projection:{kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed(String),
}

pub struct SessionDataStore {
    reference: Arc<ReferenceStore>,
    dataset: OnceCell<Arc<Dataset>>,
    facets: OnceCell<Arc<FacetTables>>,
    summary: OnceCell<Arc<DatasetSummary>>,
    structure: OnceCell<Arc<ProjectionTable>>,
    word: OnceCell<Arc<ProjectionTable>>,
    letter: OnceCell<Arc<ProjectionTable>>,
    status: RwLock<HashMap<CacheKey, LoadStatus>>,
}

impl SessionDataStore {
    pub fn new(reference: Arc<ReferenceStore>) -> Self {
        Self {
            reference,
            dataset: OnceCell::new(),
            facets: OnceCell::new(),
            summary: OnceCell::new(),
            structure: OnceCell::new(),
            word: OnceCell::new(),
            letter: OnceCell::new(),
            status: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_dataset(&self) -> Result<Arc<Dataset>, DataLoadError> {
        self.memoized(CacheKey::Dataset, &self.dataset, || self.reference.dataset())
            .await
    }

    pub async fn get_facets(&self) -> Result<Arc<FacetTables>, DataLoadError> {
        self.memoized(CacheKey::Facets, &self.facets, || self.reference.facets())
            .await
    }

    /// Values of one facet, sorted and deduplicated.
    pub async fn get_facet_values(&self, facet: Facet) -> Result<Arc<[String]>, DataLoadError> {
        Ok(self.get_facets().await?.values(facet))
    }

    pub async fn get_summary(&self) -> Result<Arc<DatasetSummary>, DataLoadError> {
        self.memoized(CacheKey::Summary, &self.summary, || self.reference.summary())
            .await
    }

    pub async fn get_projection(&self, kind: ProjectionKind) -> Result<Arc<ProjectionTable>, DataLoadError> {
        let cell = match kind {
            ProjectionKind::Structure => &self.structure,
            ProjectionKind::Word => &self.word,
            ProjectionKind::Letter => &self.letter,
        };
        self.memoized(CacheKey::Projection(kind), cell, || async move {
            self.reference.load_projection(kind).await.map(Arc::new)
        })
        .await
    }

    pub async fn status(&self, key: CacheKey) -> LoadStatus {
        self.status
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or(LoadStatus::Unloaded)
    }

    async fn memoized<T, F, Fut>(
        &self,
        key: CacheKey,
        cell: &OnceCell<Arc<T>>,
        load: F,
    ) -> Result<Arc<T>, DataLoadError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Arc<T>, DataLoadError>>,
    {
        if let Some(value) = cell.get() {
            return Ok(Arc::clone(value));
        }

        self.set_status(key, LoadStatus::Loading).await;
        let result = cell.get_or_try_init(load).await.cloned();
        match &result {
            Ok(_) => {
                debug!(key = %key, "Session cache populated");
                self.set_status(key, LoadStatus::Loaded).await;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Session cache load failed");
                self.set_status(key, LoadStatus::Failed(e.cause.clone())).await;
            }
        }
        result
    }

    async fn set_status(&self, key: CacheKey, status: LoadStatus) {
        let mut map = self.status.write().await;
        // A load that finished first must not be reported as loading again.
        if status == LoadStatus::Loading && map.get(&key) == Some(&LoadStatus::Loaded) {
            return;
        }
        map.insert(key, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::SourceError;
    use crate::reference::DataFiles;
    use crate::source::DataSource;

    const DATASET: &str = "\
id,glycan,species,immunogenicity,link
1,Man(a1-3)Man,['Escherichia_coli'],1,free
2,Gal(b1-4)Glc,['Homo_sapiens'],0,N
";
    const TAXONOMY: &str = "species,kingdom\nHomo_sapiens,Animalia\nEscherichia_coli,Bacteria\n";
    const WORDS: &str = "word,x,y\n\"['Gal', 'b1-4', 'Glc']\",1,2\n";

    /// Serves fixed files, counting reads and failing the first
    /// `fail_first` reads.
    struct FixtureSource {
        reads: AtomicUsize,
        fail_first: usize,
    }

    impl FixtureSource {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                reads: AtomicUsize::new(0),
                fail_first,
            })
        }
    }

    #[async_trait]
    impl DataSource for FixtureSource {
        fn describe(&self) -> String {
            "fixture".into()
        }

        async fn fetch(&self, file: &str) -> Result<Vec<u8>, SourceError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < self.fail_first {
                return Err(SourceError::Status {
                    url: file.to_string(),
                    status: 503,
                });
            }
            let body = match file {
                "dataset.csv" => DATASET,
                "taxonomy.csv" => TAXONOMY,
                _ => WORDS,
            };
            Ok(body.as_bytes().to_vec())
        }
    }

    fn store(source: Arc<FixtureSource>) -> SessionDataStore {
        let files = DataFiles {
            dataset: "dataset.csv".into(),
            taxonomy: "taxonomy.csv".into(),
            structure_projection: "structure.csv".into(),
            word_projection: "word.csv".into(),
            letter_projection: "letter.csv".into(),
        };
        let reference = ReferenceStore::new(source, files, "Homo sapiens");
        SessionDataStore::new(Arc::new(reference))
    }

    #[tokio::test]
    async fn test_concurrent_projection_requests_load_once() {
        let source = FixtureSource::new(0);
        let store = store(Arc::clone(&source));

        let (a, b, c) = tokio::join!(
            store.get_projection(ProjectionKind::Word),
            store.get_projection(ProjectionKind::Word),
            store.get_projection(ProjectionKind::Word),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(a.points[0].label, "Gal b1-4 Glc");
    }

    #[tokio::test]
    async fn test_repeated_calls_return_same_value() {
        let source = FixtureSource::new(0);
        let store = store(Arc::clone(&source));

        let first = store.get_dataset().await.unwrap();
        for _ in 0..5 {
            assert!(Arc::ptr_eq(&first, &store.get_dataset().await.unwrap()));
        }
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert_eq!(first.records[0].id, "SBID2");
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let source = FixtureSource::new(0);
        let store = store(Arc::clone(&source));

        store.get_projection(ProjectionKind::Structure).await.unwrap();
        assert_eq!(store.status(CacheKey::Projection(ProjectionKind::Structure)).await, LoadStatus::Loaded);
        assert_eq!(store.status(CacheKey::Projection(ProjectionKind::Word)).await, LoadStatus::Unloaded);
        assert_eq!(store.status(CacheKey::Dataset).await, LoadStatus::Unloaded);
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_key_unset_for_retry() {
        let source = FixtureSource::new(1);
        let store = store(Arc::clone(&source));

        let err = store.get_projection(ProjectionKind::Letter).await.unwrap_err();
        assert!(err.cause.contains("503"));
        assert!(matches!(
            store.status(CacheKey::Projection(ProjectionKind::Letter)).await,
            LoadStatus::Failed(_)
        ));

        let table = store.get_projection(ProjectionKind::Letter).await.unwrap();
        assert!(!table.is_empty());
        assert_eq!(
            store.status(CacheKey::Projection(ProjectionKind::Letter)).await,
            LoadStatus::Loaded
        );
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_facet_values_and_summary() {
        let store = store(FixtureSource::new(0));

        let kingdoms = store.get_facet_values(Facet::Kingdom).await.unwrap();
        assert_eq!(kingdoms.to_vec(), vec!["Animalia", "Bacteria"]);
        let bonds = store.get_facet_values(Facet::Bond).await.unwrap();
        assert_eq!(bonds.to_vec(), vec!["a1-3", "b1-4"]);

        let summary = store.get_summary().await.unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.reference_records, 1);
    }

    #[tokio::test]
    async fn test_sessions_share_reference_dataset() {
        let source = FixtureSource::new(0);
        let reference = Arc::new(ReferenceStore::new(
            Arc::clone(&source) as Arc<dyn DataSource>,
            DataFiles {
                dataset: "dataset.csv".into(),
                taxonomy: "taxonomy.csv".into(),
                structure_projection: "s.csv".into(),
                word_projection: "w.csv".into(),
                letter_projection: "l.csv".into(),
            },
            "Homo sapiens",
        ));
        let one = SessionDataStore::new(Arc::clone(&reference));
        let two = SessionDataStore::new(Arc::clone(&reference));

        let a = one.get_dataset().await.unwrap();
        let b = two.get_dataset().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }
}
