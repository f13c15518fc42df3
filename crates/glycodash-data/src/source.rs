//! Where reference files come from: a versioned release location or a local
//! directory (offline mode).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use glycodash_config::{Config, DataConfig, DataServiceConfig};

use crate::error::SourceError;

const RELEASE_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches raw bytes of a named reference file.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    async fn fetch(&self, file: &str) -> Result<Vec<u8>, SourceError>;
}

/// Select the source for this process: local files when offline, otherwise
/// the configured release.
pub fn source_from_config(config: &Config) -> Result<Arc<dyn DataSource>, SourceError> {
    let source: Arc<dyn DataSource> = if config.offline_mode {
        Arc::new(LocalDirSource::new(&config.data.local_dir))
    } else {
        Arc::new(ReleaseSource::from_config(&config.data, &config.data_service)?)
    };
    info!(source = %source.describe(), "Reference data source selected");
    Ok(source)
}

// ── Local directory ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalDirSource {
    dir: PathBuf,
}

impl LocalDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DataSource for LocalDirSource {
    fn describe(&self) -> String {
        format!("local:{}", self.dir.display())
    }

    async fn fetch(&self, file: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.dir.join(file);
        debug!(path = %path.display(), "Reading reference file");
        tokio::fs::read(&path).await.map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

// ── Versioned release ───────────────────────────────────────────────────

/// `GET {base_url}/{release}/{file}`, with HTTP Basic credentials from the
/// data-service identity when one is configured.
pub struct ReleaseSource {
    base_url: String,
    release: String,
    credentials: Option<(String, SecretString)>,
    http: reqwest::Client,
}

impl ReleaseSource {
    pub fn from_config(data: &DataConfig, service: &DataServiceConfig) -> Result<Self, SourceError> {
        let credentials = match (&service.username, &service.api_key) {
            (Some(user), Some(key)) => Some((
                user.clone(),
                SecretString::new(key.expose_secret().into()),
            )),
            _ => None,
        };
        let http = reqwest::Client::builder().timeout(RELEASE_TIMEOUT).build()?;
        Ok(Self {
            base_url: data.remote_base_url.trim_end_matches('/').to_string(),
            release: data.release.clone(),
            credentials,
            http,
        })
    }

    fn url_for(&self, file: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.release, file)
    }
}

#[async_trait]
impl DataSource for ReleaseSource {
    fn describe(&self) -> String {
        format!("{}/{}", self.base_url, self.release)
    }

    async fn fetch(&self, file: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url_for(file);
        debug!(url = %url, "Downloading reference file");

        let mut request = self.http.get(&url);
        if let Some((user, key)) = &self.credentials {
            request = request.basic_auth(user, Some(key.expose_secret()));
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn data_config(base: &str) -> DataConfig {
        DataConfig {
            remote_base_url: format!("{base}/"),
            release: "v2".into(),
            ..DataConfig::default()
        }
    }

    #[tokio::test]
    async fn test_local_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x,y\n").unwrap();
        let source = LocalDirSource::new(dir.path());
        assert_eq!(source.fetch("a.csv").await.unwrap(), b"x,y\n");
        assert!(matches!(
            source.fetch("missing.csv").await,
            Err(SourceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_release_source_uses_versioned_path_and_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/glycan_dataset.csv"))
            .and(basic_auth("analyst", "key-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("id,glycan\n"))
            .expect(1)
            .mount(&server)
            .await;

        let service = DataServiceConfig {
            username: Some("analyst".into()),
            api_key: Some(SecretString::new("key-1".into())),
        };
        let source = ReleaseSource::from_config(&data_config(&server.uri()), &service).unwrap();
        let body = source.fetch("glycan_dataset.csv").await.unwrap();
        assert_eq!(body, b"id,glycan\n");
    }

    #[tokio::test]
    async fn test_release_source_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source =
            ReleaseSource::from_config(&data_config(&server.uri()), &DataServiceConfig::default())
                .unwrap();
        assert!(matches!(
            source.fetch("taxonomy.csv").await,
            Err(SourceError::Status { status: 404, .. })
        ));
    }
}
