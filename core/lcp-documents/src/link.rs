//! Link model shared by the License and Status Documents.
//!
//! Both documents expose a `links` array of `{rel, href, type, ...}` objects.
//! Resolution prefers an exact media-type match, then an untyped link, then
//! any link carrying the rel. Templated hrefs use RFC 6570 form-style query
//! expansion (`{?id,name}`), which is the only template level the LCP
//! documents use.

use serde::{Deserialize, Serialize};

/// A single link entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Link relation (e.g. `status`, `license`, `register`).
    pub rel: String,
    /// Target URI, possibly templated.
    pub href: String,
    /// Expected media type of the target.
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Whether `href` is a URI template.
    #[serde(default)]
    pub templated: bool,
    /// Human-readable title.
    pub title: Option<String>,
    /// Expected profile of the target resource.
    pub profile: Option<String>,
    /// Content length in bytes, when known.
    pub length: Option<u64>,
    /// SHA-256 hash of the target, when known.
    pub hash: Option<String>,
}

impl Link {
    /// Creates a plain link with a rel and href.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            templated: false,
            title: None,
            profile: None,
            length: None,
            hash: None,
        }
    }

    /// Sets the expected media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Marks the href as a URI template.
    pub fn with_templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Resolves the href, expanding a templated query from `params`.
    /// Template variables without a matching parameter are dropped.
    pub fn href_with_params(&self, params: &[(&str, &str)]) -> String {
        if !self.templated {
            return self.href.clone();
        }
        expand_query_template(&self.href, params)
    }

    /// Resolves the href with no parameters, stripping any query template.
    pub fn href_resolved(&self) -> String {
        self.href_with_params(&[])
    }
}

/// The `links` array of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(Vec<Link>);

impl Links {
    pub fn new(links: Vec<Link>) -> Self {
        Self(links)
    }

    /// Returns the first link with the given rel.
    pub fn find(&self, rel: &str) -> Option<&Link> {
        self.0.iter().find(|link| link.rel == rel)
    }

    /// Returns the best link for a rel: exact media-type match first, then
    /// an untyped link, then the first link with the rel.
    pub fn find_with_type(&self, rel: &str, preferred_type: Option<&str>) -> Option<&Link> {
        let candidates = || self.0.iter().filter(|link| link.rel == rel);

        if let Some(preferred) = preferred_type {
            if let Some(link) = candidates().find(|l| l.media_type.as_deref() == Some(preferred)) {
                return Some(link);
            }
            if let Some(link) = candidates().find(|l| l.media_type.is_none()) {
                return Some(link);
            }
        }
        candidates().next()
    }

    /// Resolves the best link for a rel to a URL.
    pub fn url(&self, rel: &str, preferred_type: Option<&str>) -> Option<String> {
        self.find_with_type(rel, preferred_type)
            .map(Link::href_resolved)
    }

    pub fn all(&self) -> &[Link] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Expands a `{?a,b,c}` form-style query template, keeping only the
/// variables present in `params`. Non-query template expressions are left
/// untouched.
fn expand_query_template(href: &str, params: &[(&str, &str)]) -> String {
    let Some(open) = href.find("{?") else {
        return href.to_string();
    };
    let Some(close) = href[open..].find('}').map(|i| open + i) else {
        return href.to_string();
    };

    let variables = &href[open + 2..close];
    let pairs: Vec<String> = variables
        .split(',')
        .filter_map(|name| {
            let name = name.trim();
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| format!("{name}={}", percent_encode(value)))
        })
        .collect();

    let mut expanded = String::with_capacity(href.len());
    expanded.push_str(&href[..open]);
    if !pairs.is_empty() {
        expanded.push('?');
        expanded.push_str(&pairs.join("&"));
    }
    expanded.push_str(&href[close + 1..]);
    expanded
}

/// Percent-encodes everything outside the URI unreserved set.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
