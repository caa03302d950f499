//! Path patterns and the request view route matching works on.
//!
//! A path pattern is a regular expression anchored at the start of the
//! request path, with `{name}` placeholders for named arguments:
//!
//! | Pattern                 | Matches                    | Arguments        |
//! |-------------------------|----------------------------|------------------|
//! | `/hello`                | `/hello`, `/hello/world`   | —                |
//! | `/hello/{name}`         | `/hello/world`             | `name = world`   |
//! | `/user/{id:[0-9]+}$`    | `/user/42`, not `/user/ab` | `id = 42`        |
//! | *(empty)*               | everything                 | —                |
//!
//! Matching is prefix based: whatever the pattern leaves unconsumed is
//! available as [`UriPath::remaining`].

use std::collections::HashMap;
use std::fmt;

use http::Uri;
use http::uri::Scheme;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

// ── PathPattern ───────────────────────────────────────────────────────────────

/// A compiled route path pattern.
#[derive(Clone, Debug)]
pub struct PathPattern {
    source: String,
    regex: Option<Regex>,
}

impl PathPattern {
    /// Compiles `source`. Fails with [`Error::InvalidArgument`] when the
    /// resulting expression is not a valid regular expression.
    pub fn compile(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Ok(Self { source: String::new(), regex: None });
        }

        let expr = format!("^{}", translate(source));
        let regex = Regex::new(&expr)
            .map_err(|e| Error::invalid(format!("invalid path pattern `{source}`: {e}")))?;
        Ok(Self { source: source.to_owned(), regex: Some(regex) })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => true,
        }
    }

    /// Matches `path` and extracts the named arguments and unmatched rest.
    /// Argument values are percent-decoded; the rest stays as sent.
    pub fn captures(&self, path: &str) -> Option<UriPath> {
        let Some(regex) = &self.regex else {
            return Some(UriPath::new(&self.source, HashMap::new(), path));
        };

        let caps = regex.captures(path)?;
        let arguments = regex.capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), decode(m.as_str()))))
            .collect();
        let end = caps.get(0).map_or(0, |m| m.end());
        Some(UriPath::new(&self.source, arguments, &path[end..]))
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Rewrites `{name}` and `{name:expr}` placeholders into named groups.
/// Braces that do not start a valid placeholder (`a{2}`) stay untouched.
fn translate(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    let mut rest = source;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match placeholder(after) {
            Some((name, expr, consumed)) => {
                out.push_str(&format!("(?P<{name}>{})", expr.unwrap_or("[^/]+")));
                rest = &after[consumed..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parses `name}` or `name:expr}` at the start of `s`, balancing nested
/// braces inside `expr`. Returns the name, the optional expression and the
/// number of bytes consumed including the closing brace.
fn placeholder(s: &str) -> Option<(&str, Option<&str>, usize)> {
    let name_len = s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))?;
    let name = &s[..name_len];
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    match s[name_len..].chars().next()? {
        '}' => Some((name, None, name_len + 1)),
        ':' => {
            let body = &s[name_len + 1..];
            let mut depth = 0usize;
            for (i, c) in body.char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' if depth == 0 => return Some((name, Some(&body[..i]), name_len + 1 + i + 1)),
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

// ── UriPath ───────────────────────────────────────────────────────────────────

/// The outcome of matching a request path against a route's pattern.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UriPath {
    configured: String,
    arguments: HashMap<String, String>,
    remaining: Option<String>,
}

impl UriPath {
    pub fn new(configured: &str, arguments: HashMap<String, String>, remaining: &str) -> Self {
        Self {
            configured: configured.to_owned(),
            arguments,
            remaining: (!remaining.is_empty()).then(|| remaining.to_owned()),
        }
    }

    /// The pattern the route was declared with.
    pub fn configured(&self) -> &str { &self.configured }

    pub fn arguments(&self) -> &HashMap<String, String> { &self.arguments }

    pub fn has_argument(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    pub fn argument_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.argument(name).unwrap_or(default)
    }

    /// Path suffix the pattern did not consume, `None` when nothing is left.
    pub fn remaining(&self) -> Option<&str> {
        self.remaining.as_deref()
    }

    pub fn remaining_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.remaining().unwrap_or(default)
    }
}

// ── UriRequest ────────────────────────────────────────────────────────────────

/// Request method and URI, derived once per request for route selection.
#[derive(Clone, Debug)]
pub struct UriRequest {
    uri: Uri,
    method: String,
}

impl UriRequest {
    pub fn new(uri: Uri, method: impl Into<String>) -> Self {
        Self { uri, method: method.into() }
    }

    pub fn from_string(uri: &str, method: &str) -> Result<Self> {
        let parsed: Uri = uri
            .parse()
            .map_err(|e| Error::invalid(format!("invalid request uri `{uri}`: {e}")))?;
        Ok(Self::new(parsed, method))
    }

    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }

    /// `None` or an empty method is satisfied by every request method.
    pub fn method_equals(&self, method: Option<&str>) -> bool {
        match method {
            None | Some("") => true,
            Some(m) => self.method == m,
        }
    }

    /// Whether the request path satisfies `pattern`. An invalid pattern
    /// never matches.
    pub fn satisfies_path(&self, pattern: &str) -> bool {
        match PathPattern::compile(pattern) {
            Ok(compiled) => compiled.matches(self.path()),
            Err(e) => {
                debug!("{e}");
                false
            }
        }
    }

    pub fn satisfies_pattern(&self, pattern: &PathPattern) -> bool {
        pattern.matches(self.path())
    }

    pub fn satisfies(&self, method: Option<&str>, pattern: &str) -> bool {
        self.method_equals(method) && self.satisfies_path(pattern)
    }

    /// Arguments and remaining path for `pattern`, empty when it does not match.
    pub fn path_for(&self, pattern: &PathPattern) -> UriPath {
        pattern
            .captures(self.path())
            .unwrap_or_else(|| UriPath::new(pattern.as_str(), HashMap::new(), ""))
    }

    pub fn is_https(&self) -> bool {
        self.uri.scheme() == Some(&Scheme::HTTPS)
    }

    /// Same URI on `https`; an explicit port 80 is dropped.
    pub fn to_https(&self) -> String {
        self.with_scheme("https", 80)
    }

    /// Same URI on `http`; an explicit port 443 is dropped.
    pub fn to_http(&self) -> String {
        self.with_scheme("http", 443)
    }

    fn with_scheme(&self, scheme: &str, default_of_other: u16) -> String {
        let path = self.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let Some(host) = self.uri.host() else {
            return path.to_owned();
        };
        match self.uri.port_u16() {
            Some(port) if port != default_of_other => format!("{scheme}://{host}:{port}{path}"),
            _ => format!("{scheme}://{host}{path}"),
        }
    }
}

impl fmt::Display for UriRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}
