//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: ENVSTORE_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/envstore/{service_name}/config.toml
//! 4. System directory: /etc/envstore/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [pagination]
//! max_page_size = 50
//!
//! [auth.unauthenticated_role_bindings]
//! "default/*" = ["viewer"]
//!
//! [auth.tokens.ci-token]
//! principal = "ci"
//! role_bindings = { "*/*" = ["developer"] }
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::auth::Role;
use crate::error::{Error, Result};

/// Pattern → roles, e.g. `"default/*" = ["viewer"]`
pub type RoleBindingsConfig = BTreeMap<String, BTreeSet<Role>>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// List endpoint paging limits
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Caller identification and role bindings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Namespace defaults
    #[serde(default)]
    pub namespace: NamespaceConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Paging limits shared by every list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Largest page a caller may request; also the default page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
        }
    }
}

/// Middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    /// Request body size limit in MB
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS configuration
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
        }
    }
}

/// Where build artifacts (logs, archives) are served from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL that artifact keys are appended to
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
        }
    }
}

/// Bearer token entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Principal name the token authenticates as
    pub principal: String,

    /// Role bindings granted to the principal
    #[serde(default)]
    pub role_bindings: RoleBindingsConfig,
}

/// Caller identification and role bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Role bindings applied to requests without a bearer token
    #[serde(default = "default_unauthenticated_role_bindings")]
    pub unauthenticated_role_bindings: RoleBindingsConfig,

    /// Known bearer tokens
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            unauthenticated_role_bindings: default_unauthenticated_role_bindings(),
            tokens: BTreeMap::new(),
        }
    }
}

/// Namespace defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Namespace used when a specification does not name one
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_max_page_size() -> u64 {
    100
}

fn default_body_limit_mb() -> usize {
    10 // 10 MB
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_storage_base_url() -> String {
    "http://localhost:8080/storage".to_string()
}

fn default_unauthenticated_role_bindings() -> RoleBindingsConfig {
    BTreeMap::from([("default/*".to_string(), BTreeSet::from([Role::Viewer]))])
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Config {
    /// Load configuration from all sources
    ///
    /// Config files are merged, highest priority first:
    /// 1. Current working directory: ./config.toml
    /// 2. XDG config directory: ~/.config/envstore/{service_name}/config.toml
    /// 3. System directory: /etc/envstore/{service_name}/config.toml
    ///
    /// Environment variables (ENVSTORE_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        // Try to infer service name from binary name or use default
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "envstore-server".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so that higher priority files override lower ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("ENVSTORE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses XDG directories and loads directly from the given path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ENVSTORE_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pagination.max_page_size == 0 {
            return Err(Error::InvalidConfig(
                "pagination.max_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Find all possible config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("envstore");
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc/envstore")
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "envstore-server".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            pagination: PaginationConfig::default(),
            middleware: MiddlewareConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            namespace: NamespaceConfig::default(),
        }
    }
}
