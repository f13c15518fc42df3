//! Shared application state for the web server.

use std::sync::Arc;

use anyhow::Context;

use glycodash_auth::AuthGateway;
use glycodash_common::SessionId;
use glycodash_config::Config;
use glycodash_context::{HttpContextService, QueryDispatcher};
use glycodash_data::{source_from_config, ReferenceStore, SessionDataStore};

use crate::session::{Session, SessionRegistry};

/// Shared state injected into every Axum handler. Everything here is either
/// immutable or internally synchronized.
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: AuthGateway,
    pub reference: Arc<ReferenceStore>,
    pub dispatcher: QueryDispatcher,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        gateway: AuthGateway,
        reference: Arc<ReferenceStore>,
        dispatcher: QueryDispatcher,
    ) -> Self {
        Self {
            config,
            gateway,
            reference,
            dispatcher,
            sessions: SessionRegistry::default(),
        }
    }

    /// Wire every component from configuration. No network call is made.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let gateway = AuthGateway::from_config(&config).context("building auth gateway")?;
        let source = source_from_config(&config).context("building reference data source")?;
        let reference = Arc::new(ReferenceStore::from_config(source, &config.data));
        let service = HttpContextService::from_config(&config.context_service)
            .context("building context service client")?;
        let dispatcher = QueryDispatcher::new(Arc::new(service));
        Ok(Self::new(config, gateway, reference, dispatcher))
    }

    /// Fresh session record: auth state per the gateway, empty data cache.
    pub fn new_session(&self) -> Session {
        Session::new(
            SessionId::new(),
            self.gateway.new_session(),
            SessionDataStore::new(Arc::clone(&self.reference)),
        )
    }
}

pub type SharedState = Arc<AppState>;
