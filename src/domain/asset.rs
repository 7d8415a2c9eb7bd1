//! Static asset domain models
//!
//! Mount points pair a local static folder with the URL prefix it is served
//! under. The same prefix becomes the object key prefix in the bucket, so a
//! file's public URL and its remote key always agree.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

/// Endpoint name of the application's own static folder
pub const APP_STATIC_ENDPOINT: &str = "static";

/// Suffix appended to a plugin name to form its static endpoint
pub const PLUGIN_STATIC_SUFFIX: &str = ".static";

// ============================================================================
// Asset Records
// ============================================================================

/// A local file paired with the key it is published under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AssetRecord {
    /// Key in the bucket (e.g. `/static/css/main.css`)
    pub remote_key: String,
    /// File on disk
    pub local_path: PathBuf,
}

/// An object currently present in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteObject {
    pub key: String,
    pub size: Option<i64>,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
        }
    }
}

// ============================================================================
// Mount Points
// ============================================================================

/// A static folder and the URL prefix it is published under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountPoint {
    /// Endpoint name used for URL building (`static`, `admin.static`)
    pub endpoint: String,
    /// Local folder; `None` means the owner has no static files
    pub local_root: Option<PathBuf>,
    /// Public URL prefix, also the remote key prefix
    pub url_prefix: String,
}

impl MountPoint {
    /// The application's main static folder
    pub fn app(local_root: Option<PathBuf>, static_url_path: &str) -> Self {
        Self {
            endpoint: APP_STATIC_ENDPOINT.to_string(),
            local_root,
            url_prefix: static_url_path.to_string(),
        }
    }

    /// A plugin's static folder, mounted below the plugin's own URL prefix
    pub fn plugin(
        name: &str,
        local_root: Option<PathBuf>,
        url_prefix: Option<&str>,
        static_url_path: &str,
    ) -> Self {
        Self {
            endpoint: format!("{}{}", name, PLUGIN_STATIC_SUFFIX),
            local_root,
            url_prefix: format!("{}{}", url_prefix.unwrap_or(""), static_url_path),
        }
    }

    /// URL prefix without a trailing slash
    pub fn prefix(&self) -> &str {
        self.url_prefix.trim_end_matches('/')
    }

    /// Build the remote key for a path relative to the mount's root.
    ///
    /// Native separators become `/`; `.` components are dropped. Returns
    /// `None` when a component is not valid UTF-8.
    pub fn remote_key(&self, relative: &Path) -> Option<String> {
        let segments = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_str()),
                _ => None,
            })
            .collect::<Option<Vec<&str>>>()?;

        Some(format!("{}/{}", self.prefix(), segments.join("/")))
    }

    /// Inverse of [`MountPoint::remote_key`]: the filename part of a key
    /// that belongs to this mount
    pub fn filename_for<'a>(&self, remote_key: &'a str) -> Option<&'a str> {
        remote_key
            .strip_prefix(self.prefix())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

// ============================================================================
// Mount Registry
// ============================================================================

/// Every static mount known to the application, built once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountSet {
    mounts: Vec<MountPoint>,
}

impl MountSet {
    pub fn new(mounts: Vec<MountPoint>) -> Self {
        Self { mounts }
    }

    /// Register another mount
    pub fn push(&mut self, mount: MountPoint) {
        self.mounts.push(mount);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MountPoint> {
        self.mounts.iter()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Look up a mount by endpoint name
    pub fn get(&self, endpoint: &str) -> Option<&MountPoint> {
        self.mounts.iter().find(|m| m.endpoint == endpoint)
    }

    /// Whether `endpoint` names a registered static route
    pub fn is_static_endpoint(&self, endpoint: &str) -> bool {
        self.get(endpoint).is_some()
    }

    /// Endpoint names of all registered mounts
    pub fn endpoints(&self) -> BTreeSet<String> {
        self.mounts.iter().map(|m| m.endpoint.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a MountSet {
    type Item = &'a MountPoint;
    type IntoIter = std::slice::Iter<'a, MountPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.mounts.iter()
    }
}

// ============================================================================
// Content Types
// ============================================================================

/// Guess a content type from a file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_key_joins_prefix_and_relative_path() {
        let mount = MountPoint::app(Some(PathBuf::from("/app/static")), "/static");
        assert_eq!(
            mount.remote_key(Path::new("css/main.css")).as_deref(),
            Some("/static/css/main.css")
        );

        let mount = MountPoint::app(None, "/static/");
        assert_eq!(
            mount.remote_key(Path::new("./logo.png")).as_deref(),
            Some("/static/logo.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_remote_key_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mount = MountPoint::app(None, "/static");
        let name = Path::new(OsStr::from_bytes(b"css/bad\xff.css"));
        assert_eq!(mount.remote_key(name), None);
    }

    #[test]
    fn test_plugin_mount_endpoint_and_prefix() {
        let mount = MountPoint::plugin("admin", None, Some("/admin"), "/static");
        assert_eq!(mount.endpoint, "admin.static");
        assert_eq!(mount.url_prefix, "/admin/static");

        let mount = MountPoint::plugin("docs", None, None, "/docs-static");
        assert_eq!(mount.url_prefix, "/docs-static");
    }

    #[test]
    fn test_filename_for() {
        let mount = MountPoint::app(None, "/static");
        assert_eq!(mount.filename_for("/static/css/a.css"), Some("css/a.css"));
        assert_eq!(mount.filename_for("/staticx/a.css"), None);
        assert_eq!(mount.filename_for("/other/a.css"), None);
    }

    #[test]
    fn test_mount_set_membership() {
        let mounts = MountSet::new(vec![
            MountPoint::app(None, "/static"),
            MountPoint::plugin("admin", None, Some("/admin"), "/static"),
        ]);

        assert!(mounts.is_static_endpoint("static"));
        assert!(mounts.is_static_endpoint("admin.static"));
        // Membership, not a suffix match
        assert!(!mounts.is_static_endpoint("billing.static"));
        assert!(!mounts.is_static_endpoint("index"));
        assert_eq!(mounts.len(), 2);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/main.css")), "text/css");
        assert_eq!(content_type_for(Path::new("LOGO.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }
}
