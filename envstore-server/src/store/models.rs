//! Stored records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record identifier
pub type Id = u64;

/// Grouping of environments, the first segment of a resource path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: Id,
    pub name: String,
}

/// A named environment inside a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: Id,
    pub namespace: Namespace,
    pub name: String,
    /// Build the environment currently points at
    pub current_build_id: Option<Id>,
    /// The current build, joined on read
    pub current_build: Option<Box<Build>>,
}

impl Environment {
    /// `namespace/name`
    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.namespace.name, self.name)
    }
}

/// Lifecycle of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Queued,
    Building,
    Completed,
    Failed,
}

impl BuildStatus {
    /// Whether the build has stopped running
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One attempt at materializing a specification for an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: Id,
    pub environment_id: Id,
    /// Owning namespace name
    pub namespace: String,
    /// Owning environment name
    pub environment: String,
    pub specification: Specification,
    pub packages: Vec<CondaPackage>,
    pub status: BuildStatus,
    /// Size of the built environment in bytes
    pub size: u64,
    pub scheduled_on: DateTime<Utc>,
    pub started_on: Option<DateTime<Utc>>,
    pub ended_on: Option<DateTime<Utc>>,
}

impl Build {
    /// `namespace/environment` of the owning environment
    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.namespace, self.environment)
    }

    /// Storage key of the build log
    pub fn log_key(&self) -> String {
        format!(
            "logs/{}/{}/{}.log",
            self.namespace, self.environment, self.id
        )
    }
}

/// A registered specification, content addressed by `content_key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub id: Id,
    pub name: String,
    /// Hex digest of the canonical JSON of `spec`
    pub content_key: String,
    pub created_on: DateTime<Utc>,
    pub spec: SpecificationDocument,
}

/// User-supplied environment description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationDocument {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SpecificationDocument {
    /// Content key: blake3 of the canonical JSON encoding
    pub fn content_key(&self) -> String {
        // Struct fields serialize in declaration order, so the encoding is stable
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&canonical).to_hex().to_string()
    }
}

/// A dependency line: a conda match spec or a nested pip list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Conda(String),
    Pip { pip: Vec<String> },
}

/// Package channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondaChannel {
    pub id: Id,
    pub name: String,
    pub last_update: Option<DateTime<Utc>>,
}

/// A package available from a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondaPackage {
    pub id: Id,
    /// Channel name
    pub channel: String,
    pub name: String,
    pub version: String,
    pub build: String,
    pub license: Option<String>,
    pub summary: Option<String>,
}

/// Narrowing criteria for environment listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentFilter {
    /// Case-insensitive substring of the environment name
    pub search: Option<String>,
}

/// Narrowing criteria for package listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFilter {
    /// Case-insensitive substring of the package name
    pub search: Option<String>,
    /// Only packages installed by this build
    pub build: Option<Id>,
}

/// Case-insensitive substring test used by the search filters
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
