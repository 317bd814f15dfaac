//! Response views of stored records
//!
//! Each endpoint serializes records through an explicit view type. Summary
//! views leave out the heavy joined fields: environments drop their current
//! build, build listings drop the specification and package list.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::{
    Build, BuildStatus, CondaChannel, CondaPackage, Environment, Id, Namespace, Specification,
    SpecificationDocument,
};

/// Conversion of a stored record into its response view
pub trait Projection<R>: Serialize {
    fn from_record(record: R) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceView {
    pub id: Id,
    pub name: String,
}

impl Projection<Namespace> for NamespaceView {
    fn from_record(record: Namespace) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

/// Environment without its joined current build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSummary {
    pub id: Id,
    pub namespace: NamespaceView,
    pub name: String,
    pub current_build_id: Option<Id>,
}

impl Projection<Environment> for EnvironmentSummary {
    fn from_record(record: Environment) -> Self {
        Self {
            id: record.id,
            namespace: NamespaceView::from_record(record.namespace),
            name: record.name,
            current_build_id: record.current_build_id,
        }
    }
}

/// Build without specification and packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub id: Id,
    pub environment_id: Id,
    pub status: BuildStatus,
    pub size: u64,
    pub scheduled_on: DateTime<Utc>,
    pub started_on: Option<DateTime<Utc>>,
    pub ended_on: Option<DateTime<Utc>>,
}

impl Projection<Build> for BuildSummary {
    fn from_record(record: Build) -> Self {
        Self {
            id: record.id,
            environment_id: record.environment_id,
            status: record.status,
            size: record.size,
            scheduled_on: record.scheduled_on,
            started_on: record.started_on,
            ended_on: record.ended_on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationView {
    pub id: Id,
    pub name: String,
    pub content_key: String,
    pub created_on: DateTime<Utc>,
    pub spec: SpecificationDocument,
}

impl Projection<Specification> for SpecificationView {
    fn from_record(record: Specification) -> Self {
        Self {
            id: record.id,
            name: record.name,
            content_key: record.content_key,
            created_on: record.created_on,
            spec: record.spec,
        }
    }
}

/// Full build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDetail {
    #[serde(flatten)]
    pub summary: BuildSummary,
    pub specification: SpecificationView,
    pub packages: Vec<PackageView>,
}

impl Projection<Build> for BuildDetail {
    fn from_record(mut record: Build) -> Self {
        let specification = SpecificationView::from_record(record.specification.clone());
        let packages = std::mem::take(&mut record.packages)
            .into_iter()
            .map(PackageView::from_record)
            .collect();
        Self {
            summary: BuildSummary::from_record(record),
            specification,
            packages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelView {
    pub id: Id,
    pub name: String,
    pub last_update: Option<DateTime<Utc>>,
}

impl Projection<CondaChannel> for ChannelView {
    fn from_record(record: CondaChannel) -> Self {
        Self {
            id: record.id,
            name: record.name,
            last_update: record.last_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageView {
    pub id: Id,
    pub channel: String,
    pub name: String,
    pub version: String,
    pub build: String,
    pub license: Option<String>,
    pub summary: Option<String>,
}

impl Projection<CondaPackage> for PackageView {
    fn from_record(record: CondaPackage) -> Self {
        Self {
            id: record.id,
            channel: record.channel,
            name: record.name,
            version: record.version,
            build: record.build,
            license: record.license,
            summary: record.summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Dependency;

    fn build() -> Build {
        Build {
            id: 9,
            environment_id: 4,
            namespace: "default".into(),
            environment: "web".into(),
            specification: Specification {
                id: 2,
                name: "web".into(),
                content_key: "ab".repeat(32),
                created_on: Utc::now(),
                spec: SpecificationDocument {
                    name: "web".into(),
                    channels: vec![],
                    dependencies: vec![Dependency::Conda("flask".into())],
                    namespace: None,
                },
            },
            packages: vec![CondaPackage {
                id: 1,
                channel: "conda-forge".into(),
                name: "flask".into(),
                version: "3.0.0".into(),
                build: "pyhd8ed1ab_0".into(),
                license: Some("BSD-3-Clause".into()),
                summary: None,
            }],
            status: BuildStatus::Completed,
            size: 10,
            scheduled_on: Utc::now(),
            started_on: None,
            ended_on: None,
        }
    }

    #[test]
    fn test_build_summary_omits_heavy_fields() {
        let value = serde_json::to_value(BuildSummary::from_record(build())).unwrap();
        assert!(value.get("specification").is_none());
        assert!(value.get("packages").is_none());
        assert_eq!(value["status"], "COMPLETED");
    }

    #[test]
    fn test_build_detail_flattens_summary() {
        let value = serde_json::to_value(BuildDetail::from_record(build())).unwrap();
        assert_eq!(value["id"], 9);
        assert_eq!(value["specification"]["spec"]["dependencies"][0], "flask");
        assert_eq!(value["packages"][0]["name"], "flask");
    }

    #[test]
    fn test_specification_exposes_content_key() {
        let value = serde_json::to_value(BuildDetail::from_record(build())).unwrap();
        assert_eq!(value["specification"]["content_key"], "ab".repeat(32));
        assert!(value["specification"].get("sha256").is_none());
    }

    #[test]
    fn test_environment_summary_omits_current_build() {
        let env = Environment {
            id: 4,
            namespace: Namespace {
                id: 1,
                name: "default".into(),
            },
            name: "web".into(),
            current_build_id: Some(9),
            current_build: Some(Box::new(build())),
        };
        let value = serde_json::to_value(EnvironmentSummary::from_record(env)).unwrap();
        assert!(value.get("current_build").is_none());
        assert_eq!(value["current_build_id"], 9);
        assert_eq!(value["namespace"]["name"], "default");
    }
}
