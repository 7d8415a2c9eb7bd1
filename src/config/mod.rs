//! Configuration module for static asset publishing

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{MountPoint, MountSet};
use crate::storage::Acl;

/// Environment variable holding the access key id
pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";

/// Environment variable holding the secret access key
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Configuration errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing credentials: {0} is not set")]
    MissingCredentials(&'static str),
}

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub bucket: BucketSettings,
    #[serde(default)]
    pub urls: UrlSettings,
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub plugins: Vec<PluginSettings>,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Target bucket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BucketSettings {
    #[serde(default = "default_bucket_name")]
    pub name: String,
    /// Public domain the bucket is served from
    #[serde(default = "default_bucket_domain")]
    pub domain: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible stores (R2, MinIO)
    pub endpoint: Option<String>,
    #[serde(default)]
    pub acl: Acl,
}

/// URL rewriting configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlSettings {
    /// Point static URLs at the bucket instead of the local server
    #[serde(default)]
    pub enable_remote: bool,
}

/// The application's own static folder
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_static_folder")]
    pub static_folder: Option<PathBuf>,
    #[serde(default = "default_static_url_path")]
    pub static_url_path: String,
}

/// A plugin contributing its own static folder
#[derive(Debug, Clone, Deserialize)]
pub struct PluginSettings {
    pub name: String,
    pub static_folder: Option<PathBuf>,
    /// URL prefix the plugin is mounted under
    pub url_prefix: Option<String>,
    #[serde(default = "default_static_url_path")]
    pub static_url_path: String,
}

/// Local preview server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bucket_name() -> String {
    "static".to_string()
}

fn default_bucket_domain() -> String {
    "s3.amazonaws.com".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_static_folder() -> Option<PathBuf> {
    Some(PathBuf::from("static"))
}

fn default_static_url_path() -> String {
    "/static".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for BucketSettings {
    fn default() -> Self {
        BucketSettings {
            name: default_bucket_name(),
            domain: default_bucket_domain(),
            region: default_region(),
            endpoint: None,
            acl: Acl::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            static_folder: default_static_folder(),
            static_url_path: default_static_url_path(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Settings {
    /// Load configuration from `config_dir` and the environment
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (STATIC_S3__BUCKET__NAME, etc.)
    /// 2. {config_dir}/local.toml (gitignored)
    /// 3. {config_dir}/default.toml
    pub fn load_from(config_dir: &Path) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("STATIC_S3")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that cannot address a bucket
    pub fn validate(&self) -> Result<(), SettingsError> {
        let name = self.bucket.name.trim();
        if name.is_empty() {
            return Err(SettingsError::Invalid("bucket.name must not be empty".into()));
        }
        if name.contains('/') {
            return Err(SettingsError::Invalid(format!(
                "bucket.name must not contain '/': {}",
                name
            )));
        }
        if self.bucket.domain.trim().is_empty() {
            return Err(SettingsError::Invalid("bucket.domain must not be empty".into()));
        }
        if let Some(plugin) = self.plugins.iter().find(|p| p.name.trim().is_empty()) {
            return Err(SettingsError::Invalid(format!(
                "plugin with static folder {:?} has no name",
                plugin.static_folder
            )));
        }
        Ok(())
    }

    /// The read-only view used by the sync engine and URL rewriter
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            bucket_name: self.bucket.name.clone(),
            bucket_domain: self.bucket.domain.clone(),
            enable_remote_urls: self.urls.enable_remote,
        }
    }

    /// Build the mount registry: the app's folder first, then each plugin
    pub fn mounts(&self) -> MountSet {
        let mut mounts = MountSet::new(vec![MountPoint::app(
            self.app.static_folder.clone(),
            &self.app.static_url_path,
        )]);

        for plugin in &self.plugins {
            mounts.push(MountPoint::plugin(
                &plugin.name,
                plugin.static_folder.clone(),
                plugin.url_prefix.as_deref(),
                &plugin.static_url_path,
            ));
        }

        mounts
    }
}

/// Process-wide sync settings, fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub bucket_name: String,
    pub bucket_domain: String,
    pub enable_remote_urls: bool,
}

impl SyncConfig {
    /// Host and leading path of public bucket URLs (`domain/bucket`)
    pub fn remote_base(&self) -> String {
        format!(
            "{}/{}",
            self.bucket_domain.trim_end_matches('/'),
            self.bucket_name
        )
    }
}

/// Store credentials, sourced from the environment only
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    /// Read credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(SettingsError::MissingCredentials(name))
        };

        Ok(Credentials {
            access_key_id: read(ACCESS_KEY_VAR)?,
            secret_access_key: read(SECRET_KEY_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}
