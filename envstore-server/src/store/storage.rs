//! Artifact storage
//!
//! Build artifacts (logs, archives) live outside the record store. The API only
//! needs to turn an artifact key into a URL the caller can be redirected to.

/// Resolves artifact keys to URLs
pub trait ArtifactStorage: Send + Sync {
    /// Public URL for the artifact stored under `key`
    fn get_url(&self, key: &str) -> String;
}

/// Storage served from a fixed base URL
#[derive(Debug, Clone)]
pub struct UrlStorage {
    base_url: String,
}

impl UrlStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }
}

impl ArtifactStorage for UrlStorage {
    fn get_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}
