//! Standalone named-route URL builder
//!
//! Used where no web framework is around (the `resolve` command, tests).
//! Patterns look like `/static/{filename}`.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::{form_urlencoded, Url};

use crate::domain::MountSet;

use super::{UrlBuilder, UrlError, UrlParams, FILENAME_PARAM};

/// Characters escaped in path values; `/` is kept so nested files stay nested
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Endpoint name to URL pattern
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, String>,
    base: Option<Url>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with one `{prefix}/{filename}` route per mount
    pub fn from_mounts(mounts: &MountSet) -> Self {
        mounts.iter().fold(Self::new(), |table, mount| {
            table.route(
                &mount.endpoint,
                format!("{}/{{{}}}", mount.prefix(), FILENAME_PARAM),
            )
        })
    }

    pub fn route(mut self, endpoint: &str, pattern: impl Into<String>) -> Self {
        self.routes.insert(endpoint.to_string(), pattern.into());
        self
    }

    /// Build absolute URLs against `base` instead of bare paths
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Fill the pattern's variables, returning the path and the names used
    fn expand<'p>(
        endpoint: &str,
        pattern: &str,
        params: &'p UrlParams,
    ) -> Result<(String, Vec<&'p str>), UrlError> {
        let mut path = String::with_capacity(pattern.len());
        let mut used = Vec::new();
        let mut rest = pattern;

        while let Some(start) = rest.find('{') {
            path.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| UrlError::Build {
                endpoint: endpoint.to_string(),
                message: format!("unterminated variable in '{}'", pattern),
            })?;
            let name = &after[..end];

            let (param, value) = params
                .values()
                .find(|(n, _)| *n == name)
                .ok_or_else(|| UrlError::MissingParam {
                    endpoint: endpoint.to_string(),
                    param: name.to_string(),
                })?;
            path.extend(utf8_percent_encode(value, PATH));
            used.push(param);

            rest = &after[end + 1..];
        }
        path.push_str(rest);

        Ok((path, used))
    }
}

impl UrlBuilder for RouteTable {
    fn build_url(&self, endpoint: &str, params: &UrlParams) -> Result<String, UrlError> {
        let pattern = self
            .routes
            .get(endpoint)
            .ok_or_else(|| UrlError::UnknownEndpoint(endpoint.to_string()))?;

        let (mut url, used) = Self::expand(endpoint, pattern, params)?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in params.values().filter(|(n, _)| !used.contains(n)) {
            query.append_pair(name, value);
            has_query = true;
        }
        if has_query {
            url.push('?');
            url.push_str(&query.finish());
        }

        if let Some(anchor) = params.fragment() {
            url.push('#');
            url.extend(utf8_percent_encode(anchor, FRAGMENT));
        }

        match &self.base {
            Some(base) => base
                .join(&url)
                .map(|absolute| absolute.to_string())
                .map_err(|e| UrlError::Build {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(url),
        }
    }
}
