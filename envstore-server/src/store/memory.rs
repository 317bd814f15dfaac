//! In-process environment store
//!
//! Tables are ordered maps keyed by id behind one `RwLock`. Queries hold a
//! handle to the tables and take a fresh read lock on every execution, so a
//! page fetch and its count are two independent reads.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::http::StatusCode;
use chrono::Utc;

use super::models::{
    contains_ignore_case, Build, BuildStatus, CondaChannel, CondaPackage, Environment,
    EnvironmentFilter, Id, Namespace, PackageFilter, Specification, SpecificationDocument,
};
use super::query::CollectionQuery;
use super::{EngineResult, EnvironmentStore};
use crate::error::EngineError;

#[derive(Debug, Clone)]
struct EnvironmentRow {
    id: Id,
    namespace_id: Id,
    name: String,
    current_build_id: Option<Id>,
}

#[derive(Debug, Clone)]
struct BuildRow {
    id: Id,
    environment_id: Id,
    specification_id: Id,
    package_ids: Vec<Id>,
    status: BuildStatus,
    size: u64,
    scheduled_on: chrono::DateTime<Utc>,
    started_on: Option<chrono::DateTime<Utc>>,
    ended_on: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: Id,
    namespaces: BTreeMap<Id, Namespace>,
    environments: BTreeMap<Id, EnvironmentRow>,
    specifications: BTreeMap<Id, Specification>,
    builds: BTreeMap<Id, BuildRow>,
    channels: BTreeMap<Id, CondaChannel>,
    packages: BTreeMap<Id, CondaPackage>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn namespace_by_name(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.values().find(|ns| ns.name == name)
    }

    fn environment_row(&self, namespace: &str, name: &str) -> Option<&EnvironmentRow> {
        let namespace_id = self.namespace_by_name(namespace)?.id;
        self.environments
            .values()
            .find(|env| env.namespace_id == namespace_id && env.name == name)
    }

    fn ensure_namespace(&mut self, name: &str) -> Id {
        if let Some(ns) = self.namespace_by_name(name) {
            return ns.id;
        }
        let id = self.next_id();
        self.namespaces.insert(
            id,
            Namespace {
                id,
                name: name.to_string(),
            },
        );
        tracing::info!(namespace = name, id, "Created namespace");
        id
    }

    fn ensure_channel(&mut self, name: &str) -> Id {
        if let Some(channel) = self.channels.values().find(|c| c.name == name) {
            return channel.id;
        }
        let id = self.next_id();
        self.channels.insert(
            id,
            CondaChannel {
                id,
                name: name.to_string(),
                last_update: None,
            },
        );
        id
    }

    fn ensure_specification(&mut self, document: SpecificationDocument) -> Id {
        let key = document.content_key();
        if let Some(spec) = self.specifications.values().find(|s| s.content_key == key) {
            return spec.id;
        }
        let id = self.next_id();
        self.specifications.insert(
            id,
            Specification {
                id,
                name: document.name.clone(),
                content_key: key,
                created_on: Utc::now(),
                spec: document,
            },
        );
        id
    }

    fn ensure_environment(&mut self, namespace_id: Id, name: &str) -> Id {
        if let Some(env) = self
            .environments
            .values()
            .find(|env| env.namespace_id == namespace_id && env.name == name)
        {
            return env.id;
        }
        let id = self.next_id();
        self.environments.insert(
            id,
            EnvironmentRow {
                id,
                namespace_id,
                name: name.to_string(),
                current_build_id: None,
            },
        );
        id
    }

    fn queue_build(&mut self, environment_id: Id, specification_id: Id) -> Id {
        let id = self.next_id();
        self.builds.insert(
            id,
            BuildRow {
                id,
                environment_id,
                specification_id,
                package_ids: Vec::new(),
                status: BuildStatus::Queued,
                size: 0,
                scheduled_on: Utc::now(),
                started_on: None,
                ended_on: None,
            },
        );
        id
    }

    fn build(&self, row: &BuildRow) -> Option<Build> {
        let env = self.environments.get(&row.environment_id)?;
        let namespace = self.namespaces.get(&env.namespace_id)?;
        let specification = self.specifications.get(&row.specification_id)?;
        Some(Build {
            id: row.id,
            environment_id: env.id,
            namespace: namespace.name.clone(),
            environment: env.name.clone(),
            specification: specification.clone(),
            packages: row
                .package_ids
                .iter()
                .filter_map(|id| self.packages.get(id).cloned())
                .collect(),
            status: row.status,
            size: row.size,
            scheduled_on: row.scheduled_on,
            started_on: row.started_on,
            ended_on: row.ended_on,
        })
    }

    fn environment(&self, row: &EnvironmentRow) -> Option<Environment> {
        let namespace = self.namespaces.get(&row.namespace_id)?;
        let current_build = row
            .current_build_id
            .and_then(|id| self.builds.get(&id))
            .and_then(|build| self.build(build))
            .map(Box::new);
        Some(Environment {
            id: row.id,
            namespace: namespace.clone(),
            name: row.name.clone(),
            current_build_id: row.current_build_id,
            current_build,
        })
    }
}

/// Environment store held entirely in memory
///
/// Cloning yields another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn query<R, F>(&self, scan: F) -> CollectionQuery<R>
    where
        R: 'static,
        F: Fn(&Tables) -> Vec<R> + Send + Sync + 'static,
    {
        let tables = Arc::clone(&self.tables);
        CollectionQuery::from_fn(move || {
            let guard = tables.read().unwrap_or_else(PoisonError::into_inner);
            scan(&guard)
        })
    }

    /// Create a namespace if it does not exist yet
    pub fn ensure_namespace(&self, name: &str) -> Namespace {
        let mut tables = self.write();
        let id = tables.ensure_namespace(name);
        Namespace {
            id,
            name: name.to_string(),
        }
    }

    /// Add a package to a channel, creating the channel when missing
    pub fn add_package(
        &self,
        channel: &str,
        name: &str,
        version: &str,
        build: &str,
    ) -> CondaPackage {
        let mut tables = self.write();
        tables.ensure_channel(channel);
        let id = tables.next_id();
        let package = CondaPackage {
            id,
            channel: channel.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            build: build.to_string(),
            license: None,
            summary: None,
        };
        tables.packages.insert(id, package.clone());
        package
    }

    /// Mark a queued build as running
    pub fn start_build(&self, build_id: Id) -> EngineResult<()> {
        let mut tables = self.write();
        let row = tables
            .builds
            .get_mut(&build_id)
            .ok_or_else(|| EngineError::not_found("build id does not exist"))?;
        if row.status != BuildStatus::Queued {
            return Err(EngineError::rejected(format!(
                "build id={build_id} is not queued"
            )));
        }
        row.status = BuildStatus::Building;
        row.started_on = Some(Utc::now());
        Ok(())
    }

    /// Record a successful build with its installed packages
    ///
    /// The owning environment is switched to the completed build.
    pub fn complete_build(&self, build_id: Id, package_ids: &[Id], size: u64) -> EngineResult<()> {
        let mut tables = self.write();
        let row = tables
            .builds
            .get_mut(&build_id)
            .ok_or_else(|| EngineError::not_found("build id does not exist"))?;
        if row.status.is_finished() {
            return Err(EngineError::rejected(format!(
                "build id={build_id} already finished"
            )));
        }
        let now = Utc::now();
        row.status = BuildStatus::Completed;
        row.started_on.get_or_insert(now);
        row.ended_on = Some(now);
        row.package_ids = package_ids.to_vec();
        row.size = size;
        let environment_id = row.environment_id;

        if let Some(env) = tables.environments.get_mut(&environment_id) {
            env.current_build_id = Some(build_id);
        }
        tracing::info!(build_id, environment_id, "Build completed");
        Ok(())
    }

    /// Record a failed build
    pub fn fail_build(&self, build_id: Id) -> EngineResult<()> {
        let mut tables = self.write();
        let row = tables
            .builds
            .get_mut(&build_id)
            .ok_or_else(|| EngineError::not_found("build id does not exist"))?;
        if row.status.is_finished() {
            return Err(EngineError::rejected(format!(
                "build id={build_id} already finished"
            )));
        }
        let now = Utc::now();
        row.status = BuildStatus::Failed;
        row.started_on.get_or_insert(now);
        row.ended_on = Some(now);
        tracing::info!(build_id, "Build failed");
        Ok(())
    }
}

impl EnvironmentStore for MemoryStore {
    fn list_namespaces(&self) -> CollectionQuery<Namespace> {
        self.query(|tables| tables.namespaces.values().cloned().collect())
    }

    fn get_namespace(&self, name: &str) -> Option<Namespace> {
        self.read().namespace_by_name(name).cloned()
    }

    fn list_environments(&self, filter: &EnvironmentFilter) -> CollectionQuery<Environment> {
        let query = self.query(|tables| {
            tables
                .environments
                .values()
                .filter_map(|row| tables.environment(row))
                .collect()
        });
        match filter.search.clone() {
            Some(search) => query.filter(move |env| contains_ignore_case(&env.name, &search)),
            None => query,
        }
    }

    fn get_environment(&self, namespace: &str, name: &str) -> Option<Environment> {
        let tables = self.read();
        let row = tables.environment_row(namespace, name)?;
        tables.environment(row)
    }

    fn list_builds(&self) -> CollectionQuery<Build> {
        self.query(|tables| {
            tables
                .builds
                .values()
                .filter_map(|row| tables.build(row))
                .collect()
        })
    }

    fn get_build(&self, id: Id) -> Option<Build> {
        let tables = self.read();
        tables.builds.get(&id).and_then(|row| tables.build(row))
    }

    fn list_channels(&self) -> CollectionQuery<CondaChannel> {
        self.query(|tables| tables.channels.values().cloned().collect())
    }

    fn list_packages(&self, filter: &PackageFilter) -> CollectionQuery<CondaPackage> {
        let build = filter.build;
        let mut query = self.query(move |tables| match build {
            Some(build_id) => tables
                .builds
                .get(&build_id)
                .map(|row| {
                    tables
                        .packages
                        .values()
                        .filter(|p| row.package_ids.contains(&p.id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => tables.packages.values().cloned().collect(),
        });
        if let Some(search) = filter.search.clone() {
            query = query.filter(move |package| contains_ignore_case(&package.name, &search));
        }
        query
    }

    fn register_specification(
        &self,
        namespace: &str,
        document: SpecificationDocument,
    ) -> EngineResult<Build> {
        let mut tables = self.write();
        let namespace_id = tables.ensure_namespace(namespace);
        for channel in &document.channels {
            tables.ensure_channel(channel);
        }
        let environment_name = document.name.clone();
        let specification_id = tables.ensure_specification(document);
        let environment_id = tables.ensure_environment(namespace_id, &environment_name);
        let build_id = tables.queue_build(environment_id, specification_id);

        tracing::info!(
            namespace,
            environment = %environment_name,
            build_id,
            "Registered specification"
        );

        tables
            .builds
            .get(&build_id)
            .and_then(|row| tables.build(row))
            .ok_or_else(|| {
                EngineError::new(StatusCode::INTERNAL_SERVER_ERROR, "build was not recorded")
            })
    }

    fn update_environment_build(
        &self,
        namespace: &str,
        name: &str,
        build_id: Id,
    ) -> EngineResult<()> {
        let mut tables = self.write();
        let environment_id = tables
            .environment_row(namespace, name)
            .map(|row| row.id)
            .ok_or_else(|| EngineError::rejected("environment does not exist"))?;

        let build = tables
            .builds
            .get(&build_id)
            .ok_or_else(|| EngineError::rejected(format!("build id={build_id} does not exist")))?;
        if build.environment_id != environment_id {
            return Err(EngineError::rejected(format!(
                "build id={build_id} is not a build for environment {namespace}/{name}"
            )));
        }
        if build.status != BuildStatus::Completed {
            return Err(EngineError::rejected(format!(
                "build id={build_id} is not completed"
            )));
        }

        if let Some(env) = tables.environments.get_mut(&environment_id) {
            env.current_build_id = Some(build_id);
        }
        tracing::info!(namespace, environment = name, build_id, "Updated environment build");
        Ok(())
    }

    fn delete_environment(&self, namespace: &str, name: &str) -> EngineResult<()> {
        let mut tables = self.write();
        let environment_id = tables
            .environment_row(namespace, name)
            .map(|row| row.id)
            .ok_or_else(|| EngineError::not_found("environment does not exist"))?;

        tables.environments.remove(&environment_id);
        tables
            .builds
            .retain(|_, build| build.environment_id != environment_id);
        tracing::info!(namespace, environment = name, "Deleted environment");
        Ok(())
    }

    fn create_build(&self, environment_id: Id, specification_key: &str) -> EngineResult<Build> {
        let mut tables = self.write();
        if !tables.environments.contains_key(&environment_id) {
            return Err(EngineError::not_found("environment does not exist"));
        }
        let specification_id = tables
            .specifications
            .values()
            .find(|s| s.content_key == specification_key)
            .map(|s| s.id)
            .ok_or_else(|| EngineError::not_found("specification does not exist"))?;

        let build_id = tables.queue_build(environment_id, specification_id);
        tracing::info!(environment_id, build_id, "Queued build");

        tables
            .builds
            .get(&build_id)
            .and_then(|row| tables.build(row))
            .ok_or_else(|| {
                EngineError::new(StatusCode::INTERNAL_SERVER_ERROR, "build was not recorded")
            })
    }

    fn delete_build(&self, build_id: Id) -> EngineResult<()> {
        let mut tables = self.write();
        let build = tables
            .builds
            .get(&build_id)
            .ok_or_else(|| EngineError::not_found("build id does not exist"))?;
        if !build.status.is_finished() {
            return Err(EngineError::rejected(
                "cannot delete build since not finished",
            ));
        }
        let is_current = tables
            .environments
            .get(&build.environment_id)
            .is_some_and(|env| env.current_build_id == Some(build_id));
        if is_current {
            return Err(EngineError::rejected(
                "cannot delete current build of environment",
            ));
        }

        tables.builds.remove(&build_id);
        tracing::info!(build_id, "Deleted build");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dependency, OrderDirection};

    fn spec(name: &str) -> SpecificationDocument {
        SpecificationDocument {
            name: name.to_string(),
            channels: vec!["conda-forge".to_string()],
            dependencies: vec![Dependency::Conda("python".to_string())],
            namespace: None,
        }
    }

    #[test]
    fn test_register_creates_graph() {
        let store = MemoryStore::new();
        let build = store.register_specification("data", spec("etl")).unwrap();

        assert_eq!(build.status, BuildStatus::Queued);
        assert_eq!(build.resource_path(), "data/etl");
        assert!(store.get_namespace("data").is_some());
        assert_eq!(store.list_channels().count(), 1);

        let env = store.get_environment("data", "etl").unwrap();
        assert_eq!(env.current_build_id, None);
    }

    #[test]
    fn test_identical_specification_is_reused() {
        let store = MemoryStore::new();
        let first = store.register_specification("data", spec("etl")).unwrap();
        let second = store.register_specification("data", spec("etl")).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.specification.id, second.specification.id);
        assert_eq!(store.list_environments(&EnvironmentFilter::default()).count(), 1);
    }

    #[test]
    fn test_complete_build_sets_current() {
        let store = MemoryStore::new();
        let numpy = store.add_package("conda-forge", "numpy", "2.1.0", "py312_0");
        let build = store.register_specification("data", spec("etl")).unwrap();
        store.start_build(build.id).unwrap();
        store.complete_build(build.id, &[numpy.id], 1024).unwrap();

        let env = store.get_environment("data", "etl").unwrap();
        assert_eq!(env.current_build_id, Some(build.id));
        let current = env.current_build.unwrap();
        assert_eq!(current.status, BuildStatus::Completed);
        assert_eq!(current.packages, vec![numpy]);
    }

    #[test]
    fn test_update_environment_build_rules() {
        let store = MemoryStore::new();
        let a = store.register_specification("data", spec("etl")).unwrap();
        let other = store.register_specification("data", spec("web")).unwrap();

        let err = store.update_environment_build("data", "etl", a.id).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("not completed"));

        store.complete_build(other.id, &[], 0).unwrap();
        let err = store
            .update_environment_build("data", "etl", other.id)
            .unwrap_err();
        assert!(err.message.contains("not a build for environment"));

        let err = store.update_environment_build("data", "etl", 999).unwrap_err();
        assert!(err.message.contains("does not exist"));

        store.complete_build(a.id, &[], 0).unwrap();
        let b = store
            .create_build(a.environment_id, &a.specification.content_key)
            .unwrap();
        store.complete_build(b.id, &[], 0).unwrap();
        store.update_environment_build("data", "etl", a.id).unwrap();
        assert_eq!(
            store.get_environment("data", "etl").unwrap().current_build_id,
            Some(a.id)
        );
    }

    #[test]
    fn test_delete_build_rules() {
        let store = MemoryStore::new();
        let a = store.register_specification("data", spec("etl")).unwrap();

        let err = store.delete_build(a.id).unwrap_err();
        assert!(err.message.contains("not finished"));

        store.complete_build(a.id, &[], 0).unwrap();
        let err = store.delete_build(a.id).unwrap_err();
        assert!(err.message.contains("current build"));

        let b = store
            .create_build(a.environment_id, &a.specification.content_key)
            .unwrap();
        store.fail_build(b.id).unwrap();
        store.delete_build(b.id).unwrap();
        assert!(store.get_build(b.id).is_none());

        assert_eq!(
            store.delete_build(b.id).unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_delete_environment_removes_builds() {
        let store = MemoryStore::new();
        let build = store.register_specification("data", spec("etl")).unwrap();
        store.delete_environment("data", "etl").unwrap();

        assert!(store.get_environment("data", "etl").is_none());
        assert!(store.get_build(build.id).is_none());
        assert_eq!(
            store.delete_environment("data", "etl").unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_create_build_unknown_specification() {
        let store = MemoryStore::new();
        let build = store.register_specification("data", spec("etl")).unwrap();
        let err = store.create_build(build.environment_id, "missing").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_search_filters() {
        let store = MemoryStore::new();
        store.register_specification("data", spec("Pipeline")).unwrap();
        store.register_specification("data", spec("web")).unwrap();
        store.add_package("conda-forge", "numpy", "2.1.0", "0");
        store.add_package("conda-forge", "pandas", "2.2.0", "0");

        let envs = store.list_environments(&EnvironmentFilter {
            search: Some("pipe".into()),
        });
        assert_eq!(envs.count(), 1);

        let packages = store.list_packages(&PackageFilter {
            search: Some("NUM".into()),
            build: None,
        });
        assert_eq!(packages.all()[0].name, "numpy");
    }

    #[test]
    fn test_packages_by_build() {
        let store = MemoryStore::new();
        let numpy = store.add_package("conda-forge", "numpy", "2.1.0", "0");
        store.add_package("conda-forge", "pandas", "2.2.0", "0");
        let build = store.register_specification("data", spec("etl")).unwrap();
        store.complete_build(build.id, &[numpy.id], 0).unwrap();

        let by_build = store.list_packages(&PackageFilter {
            search: None,
            build: Some(build.id),
        });
        assert_eq!(by_build.all(), vec![numpy]);

        let unknown = store.list_packages(&PackageFilter {
            search: None,
            build: Some(404),
        });
        assert_eq!(unknown.count(), 0);
    }

    #[test]
    fn test_queries_observe_later_writes() {
        let store = MemoryStore::new();
        let query = store.list_namespaces().order_by(
            |a: &Namespace, b: &Namespace| a.name.cmp(&b.name),
            OrderDirection::Ascending,
        );
        assert_eq!(query.count(), 0);

        store.ensure_namespace("late");
        assert_eq!(query.count(), 1);
        assert_eq!(query.all()[0].name, "late");
    }
}
