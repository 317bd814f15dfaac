//! # envstore-server
//!
//! REST API for browsing and managing environment builds: namespaces,
//! environments, builds, channels and packages.
//!
//! ## Features
//!
//! - **Uniform list protocol**: every list endpoint pages, sorts against a
//!   per-endpoint whitelist, and reports a total count after permission filtering
//! - **Role-binding authorization**: `namespace/name` patterns grant roles to
//!   anonymous callers and to bearer-token principals
//! - **Layered configuration**: defaults, TOML files and `ENVSTORE_` variables
//! - **Middleware stack**: request IDs, sensitive header masking, compression,
//!   CORS, timeouts, body limits and panic recovery
//!
//! ## Example
//!
//! ```rust,no_run
//! use envstore_server::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder()
//!         .config(config.clone())
//!         .store(MemoryStore::new())
//!         .build()?;
//!
//!     Server::new(config).serve(api::router(state)).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;
pub mod store;

/// Commonly used items
pub mod prelude {
    pub use crate::api::{
        self, Ack, Item, ListParams, Paginated, Projection, Responder, SortField, SortSpec,
    };
    pub use crate::auth::{
        Authenticator, Authorizer, Permission, PermissionSet, Role, RoleBindingAuthorizer,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::observability::{init_tracing, shutdown_tracing};
    pub use crate::server::Server;
    pub use crate::state::AppState;
    pub use crate::store::{
        ArtifactStorage, CollectionQuery, EnvironmentStore, MemoryStore, OrderDirection, UrlStorage,
    };
}
