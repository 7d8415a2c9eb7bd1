//! Points static asset URLs at the bucket

use std::collections::BTreeSet;

use url::Url;

use crate::config::SyncConfig;
use crate::domain::MountSet;

use super::{UrlBuilder, UrlError, UrlParams};

/// Base used to parse relative URLs produced by native builders
const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Rewrites static endpoint URLs to protocol-relative bucket URLs
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    config: SyncConfig,
    static_endpoints: BTreeSet<String>,
}

impl UrlRewriter {
    pub fn new(config: SyncConfig, mounts: &MountSet) -> Self {
        Self {
            config,
            static_endpoints: mounts.endpoints(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable_remote_urls
    }

    pub fn is_static_endpoint(&self, endpoint: &str) -> bool {
        self.static_endpoints.contains(endpoint)
    }

    /// Build the URL for `endpoint`.
    ///
    /// With remote URLs off this is exactly `native.build_url`. With them on,
    /// static endpoints get `//{domain}/{bucket}{path}` with the native
    /// URL's query and fragment carried over.
    pub fn resolve<B: UrlBuilder + ?Sized>(
        &self,
        native: &B,
        endpoint: &str,
        params: &UrlParams,
    ) -> Result<String, UrlError> {
        let built = native.build_url(endpoint, params)?;

        if !self.is_enabled() || !self.is_static_endpoint(endpoint) {
            return Ok(built);
        }

        self.to_remote(endpoint, &built)
    }

    /// A builder with the same signature as `native`, for drop-in use
    pub fn with_native<'a, B: UrlBuilder + ?Sized>(&'a self, native: &'a B) -> RemoteUrlBuilder<'a, B> {
        RemoteUrlBuilder {
            rewriter: self,
            native,
        }
    }

    fn to_remote(&self, endpoint: &str, built: &str) -> Result<String, UrlError> {
        let build_error = |e: url::ParseError| UrlError::Build {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        };

        let base = Url::parse(PLACEHOLDER_BASE).map_err(build_error)?;
        let parsed = Url::options()
            .base_url(Some(&base))
            .parse(built)
            .map_err(build_error)?;

        let mut url = format!("//{}{}", self.config.remote_base(), parsed.path());
        if let Some(query) = parsed.query() {
            url.push('?');
            url.push_str(query);
        }
        if let Some(fragment) = parsed.fragment() {
            url.push('#');
            url.push_str(fragment);
        }

        Ok(url)
    }
}

/// [`UrlRewriter`] bound to a native builder
pub struct RemoteUrlBuilder<'a, B: ?Sized> {
    rewriter: &'a UrlRewriter,
    native: &'a B,
}

impl<B: UrlBuilder + ?Sized> UrlBuilder for RemoteUrlBuilder<'_, B> {
    fn build_url(&self, endpoint: &str, params: &UrlParams) -> Result<String, UrlError> {
        self.rewriter.resolve(self.native, endpoint, params)
    }
}
