//! RPC boundary to the Context Analysis Service.
//!
//! The service computes co-occurrence and branch-position statistics for a
//! glycoletter. Its algorithm is not reproduced here; the dispatcher only
//! talks to it through [`ContextAnalysisService`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use glycodash_config::ContextServiceConfig;

use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextRequest {
    pub glycoletter: String,
    pub mode: &'static str,
    pub taxonomy_filter: &'static str,
    pub taxonomy_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextResponse {
    #[serde(default)]
    pub title: String,
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRequest {
    pub glycoletter: String,
    pub taxonomy_filter: &'static str,
    pub taxonomy_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BranchResponse {
    pub main: u64,
    pub side: u64,
}

#[async_trait]
pub trait ContextAnalysisService: Send + Sync {
    async fn characterize_context(&self, request: &ContextRequest) -> Result<ContextResponse, QueryError>;

    async fn main_vs_side_branch(&self, request: &BranchRequest) -> Result<BranchResponse, QueryError>;
}

/// JSON-over-HTTP client: `POST {base_url}/characterize_context` and
/// `POST {base_url}/main_v_side_branch`.
pub struct HttpContextService {
    base_url: String,
    http: reqwest::Client,
}

impl HttpContextService {
    pub fn from_config(config: &ContextServiceConfig) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, QueryError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url, operation);
        debug!(url = %url, "Calling context service");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Service {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<Resp>()
            .await
            .map_err(|e| QueryError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ContextAnalysisService for HttpContextService {
    async fn characterize_context(&self, request: &ContextRequest) -> Result<ContextResponse, QueryError> {
        self.post("characterize_context", request).await
    }

    async fn main_vs_side_branch(&self, request: &BranchRequest) -> Result<BranchResponse, QueryError> {
        self.post("main_v_side_branch", request).await
    }
}
