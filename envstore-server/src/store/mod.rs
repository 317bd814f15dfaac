//! Data access and environment engine contracts
//!
//! # Overview
//!
//! - [`EnvironmentStore`]: list/get access for every entity plus the engine
//!   operations that mutate environments and builds
//! - [`CollectionQuery`]: the composable query type list operations return
//! - [`ArtifactStorage`]: key to URL resolution for build artifacts
//! - [`MemoryStore`]: in-process implementation used by the binary and tests

pub mod memory;
pub mod models;
pub mod query;
pub mod storage;

pub use memory::MemoryStore;
pub use models::{
    Build, BuildStatus, CondaChannel, CondaPackage, Dependency, Environment, EnvironmentFilter,
    Id, Namespace, PackageFilter, Specification, SpecificationDocument,
};
pub use query::{CollectionQuery, OrderDirection, RecordSource};
pub use storage::{ArtifactStorage, UrlStorage};

use crate::error::EngineError;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Record access and environment engine
///
/// List operations return unexecuted queries; callers refine them (permission
/// filtering, ordering, paging) before running them.
pub trait EnvironmentStore: Send + Sync {
    /// All namespaces
    fn list_namespaces(&self) -> CollectionQuery<Namespace>;

    /// Namespace by name
    fn get_namespace(&self, name: &str) -> Option<Namespace>;

    /// Environments matching `filter`
    fn list_environments(&self, filter: &EnvironmentFilter) -> CollectionQuery<Environment>;

    /// Environment by resource path segments
    fn get_environment(&self, namespace: &str, name: &str) -> Option<Environment>;

    /// All builds
    fn list_builds(&self) -> CollectionQuery<Build>;

    /// Build by id
    fn get_build(&self, id: Id) -> Option<Build>;

    /// All channels
    fn list_channels(&self) -> CollectionQuery<CondaChannel>;

    /// Packages matching `filter`
    fn list_packages(&self, filter: &PackageFilter) -> CollectionQuery<CondaPackage>;

    /// Register a specification in `namespace`, creating the namespace and
    /// environment when missing, and queue a build of it
    fn register_specification(
        &self,
        namespace: &str,
        document: SpecificationDocument,
    ) -> EngineResult<Build>;

    /// Point an environment at one of its completed builds
    fn update_environment_build(&self, namespace: &str, name: &str, build_id: Id)
        -> EngineResult<()>;

    /// Remove an environment together with its builds
    fn delete_environment(&self, namespace: &str, name: &str) -> EngineResult<()>;

    /// Queue a new build of `specification_key` for an environment
    fn create_build(&self, environment_id: Id, specification_key: &str) -> EngineResult<Build>;

    /// Remove a finished build that is not the current build of its environment
    fn delete_build(&self, build_id: Id) -> EngineResult<()>;
}
