//! Application state management

use std::sync::Arc;

use crate::api::Responder;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::error::Result;
use crate::store::{ArtifactStorage, EnvironmentStore, MemoryStore, UrlStorage};

/// Application state shared across handlers
///
/// Everything is behind `Arc`, so cloning per request is cheap and handlers
/// never share mutable state through it.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn EnvironmentStore>,
    storage: Arc<dyn ArtifactStorage>,
    authenticator: Arc<Authenticator>,
    responder: Responder,
}

impl AppState {
    /// Create a builder for constructing AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record store and environment engine
    pub fn store(&self) -> &dyn EnvironmentStore {
        self.store.as_ref()
    }

    /// Artifact URL resolution
    pub fn storage(&self) -> &dyn ArtifactStorage {
        self.storage.as_ref()
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Paginated list responder configured with the server's paging limits
    pub fn responder(&self) -> &Responder {
        &self.responder
    }
}

/// Builder for AppState
///
/// ```rust
/// use envstore_server::prelude::*;
///
/// let state = AppState::builder()
///     .config(Config::default())
///     .store(MemoryStore::new())
///     .build()
///     .unwrap();
/// assert_eq!(state.responder().max_page_size(), 100);
/// ```
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    store: Option<Arc<dyn EnvironmentStore>>,
    storage: Option<Arc<dyn ArtifactStorage>>,
}

impl AppStateBuilder {
    /// Create a new builder
    ///
    /// Unset parts default to `Config::default()`, an empty [`MemoryStore`]
    /// and [`UrlStorage`] rooted at `storage.base_url`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the record store
    pub fn store(mut self, store: impl EnvironmentStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the artifact storage
    pub fn storage(mut self, storage: impl ArtifactStorage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Build the AppState
    ///
    /// Fails when the configuration is invalid or a role binding pattern
    /// does not compile.
    pub fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let responder = Responder::new(config.pagination)?;
        let authenticator = Authenticator::from_config(&config.auth)?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(UrlStorage::new(config.storage.base_url.clone())));

        Ok(AppState {
            config: Arc::new(config),
            store,
            storage,
            authenticator: Arc::new(authenticator),
            responder,
        })
    }
}
