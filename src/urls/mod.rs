//! URL building for static assets
//!
//! `UrlBuilder` is the shape of a web framework's native "url for endpoint"
//! function. `UrlRewriter` wraps any builder and, when remote URLs are
//! enabled, points static endpoints at the bucket instead.

mod rewriter;
mod route_table;

pub use rewriter::{RemoteUrlBuilder, UrlRewriter};
pub use route_table::RouteTable;

use thiserror::Error;

/// Parameter carrying the file path of a static endpoint
pub const FILENAME_PARAM: &str = "filename";

/// URL building errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("No route named '{0}'")]
    UnknownEndpoint(String),

    #[error("Missing parameter '{param}' for endpoint '{endpoint}'")]
    MissingParam { endpoint: String, param: String },

    #[error("Failed to build URL for '{endpoint}': {message}")]
    Build { endpoint: String, message: String },
}

/// Values passed when building a URL.
///
/// Values named by the route's path variables fill the path; the rest become
/// the query string, in insertion order. The anchor becomes the fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    values: Vec<(String, String)>,
    anchor: Option<String>,
}

impl UrlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params for a static file
    pub fn filename(name: impl Into<String>) -> Self {
        Self::new().with(FILENAME_PARAM, name)
    }

    /// Set a value, replacing any earlier value with the same name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    pub fn anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn fragment(&self) -> Option<&str> {
        self.anchor.as_deref()
    }
}

/// A framework's native URL builder
pub trait UrlBuilder {
    fn build_url(&self, endpoint: &str, params: &UrlParams) -> Result<String, UrlError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_replace_and_order() {
        let params = UrlParams::filename("a.css")
            .with("v", "1")
            .with("lang", "en")
            .with("v", "2")
            .anchor("top");

        assert_eq!(params.get("filename"), Some("a.css"));
        assert_eq!(params.get("v"), Some("2"));
        let names: Vec<&str> = params.values().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["filename", "v", "lang"]);
        assert_eq!(params.fragment(), Some("top"));
    }
}
