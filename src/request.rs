//! Incoming HTTP request type.

use http::{Extensions, Uri};

use crate::error::{Error, Result};
use crate::uri::UriRequest;
use crate::version::HttpVersion;

/// An incoming HTTP request.
///
/// The server adapter builds one per hyper request; tests build them with
/// [`Request::new`] and the `with_*` helpers. Typed per-request state (the
/// [`Session`](crate::Session) for example) travels in [`extensions`](Request::extensions).
pub struct Request {
    method: String,
    uri: Uri,
    version: HttpVersion,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    extensions: Extensions,
    cancelled: bool,
}

impl Request {
    /// Builds a request for `method` on `uri`. Fails when `uri` cannot be parsed.
    pub fn new(method: &str, uri: &str) -> Result<Self> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| Error::invalid(format!("invalid request uri `{uri}`: {e}")))?;
        Ok(Self::from_parts(method.to_owned(), uri, HttpVersion::default(), Vec::new(), Vec::new()))
    }

    pub(crate) fn from_parts(
        method: String,
        uri: Uri,
        version: HttpVersion,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self { method, uri, version, headers, body, extensions: Extensions::new(), cancelled: false }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> HttpVersion { self.version }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Value of the cookie `name` from the `Cookie` request header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Decoded value of the query parameter `name`.
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Marks the request as handled; post-interceptors will not run.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Method and URI in the form route matching works on.
    pub fn uri_request(&self) -> UriRequest {
        UriRequest::new(self.uri.clone(), self.method.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new("GET", "http://example.com/").unwrap()
            .with_header("Accept", "text/html");
        assert_eq!(req.header("accept"), Some("text/html"));
        assert!(!req.has_header("origin"));
    }

    #[test]
    fn reads_cookies_and_params() {
        let req = Request::new("GET", "http://example.com/?name=J%C3%BCrgen&x=1").unwrap()
            .with_header("Cookie", "a=1; sid=abc");
        assert_eq!(req.cookie("sid"), Some("abc"));
        assert_eq!(req.cookie("missing"), None);
        assert_eq!(req.param("name").as_deref(), Some("Jürgen"));
        assert_eq!(req.param("y"), None);
    }

    #[test]
    fn cancel_is_sticky() {
        let mut req = Request::new("GET", "/").unwrap();
        assert!(!req.is_cancelled());
        req.cancel();
        assert!(req.is_cancelled());
    }

    #[test]
    fn rejects_unparseable_uri() {
        assert!(Request::new("GET", "http://exa mple.com/").is_err());
    }
}
