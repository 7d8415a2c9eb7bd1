//! actix-web integration
//!
//! Registers one named resource per static mount, so the framework's own
//! `url_for` can build static URLs, and lets the URL rewriter sit on top of
//! it as a drop-in replacement.

pub mod handlers;

use std::path::{Component, Path, PathBuf};

use actix_web::{error::UrlGenerationError, web, HttpRequest};

use crate::domain::MountSet;
use crate::urls::{UrlBuilder, UrlError, UrlParams, UrlRewriter, FILENAME_PARAM};

/// Shared state of the preview server
pub struct WebState {
    pub mounts: MountSet,
    pub rewriter: UrlRewriter,
}

impl WebState {
    pub fn new(mounts: MountSet, rewriter: UrlRewriter) -> Self {
        Self { mounts, rewriter }
    }
}

/// Local folder behind one static resource
#[derive(Debug, Clone)]
pub struct StaticRoot(pub PathBuf);

impl StaticRoot {
    /// Map a requested filename to a path inside the root.
    ///
    /// Only plain components are accepted; `..`, absolute paths and drive
    /// prefixes yield `None`.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let relative = Path::new(filename);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_))) {
            Some(self.0.join(relative))
        } else {
            None
        }
    }
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig, mounts: &MountSet) {
    cfg.service(
        web::resource("/health")
            .name("health")
            .route(web::get().to(handlers::health_check)),
    )
    .service(
        web::resource("/assets")
            .name("assets")
            .route(web::get().to(handlers::list_assets)),
    );

    configure_static(cfg, mounts);
}

/// Register a GET resource named after each mount's endpoint
pub fn configure_static(cfg: &mut web::ServiceConfig, mounts: &MountSet) {
    for mount in mounts {
        let Some(root) = mount.local_root.clone() else {
            continue;
        };

        let pattern = format!("{}/{{{}:.*}}", mount.prefix(), FILENAME_PARAM);
        cfg.service(
            web::resource(pattern)
                .name(&mount.endpoint)
                .app_data(web::Data::new(StaticRoot(root)))
                .route(web::get().to(handlers::serve_asset)),
        );
    }
}

/// actix's named-resource URL generation as a native builder.
///
/// The `filename` value fills the resource's path variable; every other
/// value goes into the query string.
impl UrlBuilder for HttpRequest {
    fn build_url(&self, endpoint: &str, params: &UrlParams) -> Result<String, UrlError> {
        let elements: Vec<&str> = params.get(FILENAME_PARAM).into_iter().collect();

        let mut url = self.url_for(endpoint, elements).map_err(|e| match e {
            UrlGenerationError::ResourceNotFound => UrlError::UnknownEndpoint(endpoint.to_string()),
            UrlGenerationError::NotEnoughElements => UrlError::MissingParam {
                endpoint: endpoint.to_string(),
                param: FILENAME_PARAM.to_string(),
            },
            other => UrlError::Build {
                endpoint: endpoint.to_string(),
                message: other.to_string(),
            },
        })?;

        let query: Vec<(&str, &str)> = params
            .values()
            .filter(|(name, _)| *name != FILENAME_PARAM)
            .collect();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.set_fragment(params.fragment());

        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_root_rejects_escapes() {
        let root = StaticRoot(PathBuf::from("/srv/static"));

        assert_eq!(root.resolve("css/a.css"), Some(PathBuf::from("/srv/static/css/a.css")));
        assert_eq!(root.resolve("../etc/passwd"), None);
        assert_eq!(root.resolve("css/../../x"), None);
        assert_eq!(root.resolve("/etc/passwd"), None);
        assert_eq!(root.resolve(""), None);
    }
}
