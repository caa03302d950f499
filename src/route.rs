//! Route configuration.

use std::any::type_name;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::interceptor::{PostRef, PreRef};
use crate::method::Method;
use crate::response::SupportedMimeTypes;
use crate::response::format::Formatter;
use crate::uri::{PathPattern, UriPath, UriRequest};

/// One declared route: path pattern, handler and everything that applies
/// only to requests it matches.
///
/// Built during configuration through the `&mut Self` methods returned by
/// [`Routing::on_get`](crate::Routing::on_get) and friends; read-only once
/// requests are served.
#[derive(Clone, Debug)]
pub struct Route {
    pattern: PathPattern,
    handler: Handler,
    methods: Vec<Method>,
    pre: Vec<PreRef>,
    post: Vec<PostRef>,
    https_only: bool,
    login_only: bool,
    role: Option<String>,
    mime_types: SupportedMimeTypes,
}

impl Route {
    /// A route for `path` answering to `methods`, or to
    /// [`Method::STANDARD`] when `methods` is empty.
    pub fn new(path: &str, handler: impl Into<Handler>, methods: &[Method]) -> Result<Self> {
        Ok(Self {
            pattern: PathPattern::compile(path)?,
            handler: handler.into(),
            methods: methods.to_vec(),
            pre: Vec::new(),
            post: Vec::new(),
            https_only: false,
            login_only: false,
            role: None,
            mime_types: SupportedMimeTypes::default(),
        })
    }

    /// Like [`new`](Self::new) with method names such as `"GET"`. Unknown
    /// names fail with [`Error::InvalidArgument`].
    pub fn with_method_names(path: &str, handler: impl Into<Handler>, methods: &[&str]) -> Result<Self> {
        let methods = methods
            .iter()
            .map(|m| m.parse::<Method>())
            .collect::<Result<Vec<_>, Error>>()?;
        Self::new(path, handler, &methods)
    }

    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Configured methods, or [`Method::STANDARD`] when none were given.
    pub fn allowed_request_methods(&self) -> Vec<Method> {
        if self.methods.is_empty() {
            Method::STANDARD.to_vec()
        } else {
            self.methods.clone()
        }
    }

    fn allows(&self, method: &str) -> bool {
        self.allowed_request_methods().iter().any(|m| m.as_str() == method)
    }

    /// Path satisfied and method allowed. A `HEAD` request is also matched
    /// by a route that allows `GET`.
    pub fn matches(&self, uri: &UriRequest) -> bool {
        self.matches_path(uri)
            && (self.allows(uri.method()) || (uri.method() == "HEAD" && self.allows("GET")))
    }

    /// Path satisfied, whatever the method.
    pub fn matches_path(&self, uri: &UriRequest) -> bool {
        uri.satisfies_pattern(&self.pattern)
    }

    pub fn uri_path(&self, uri: &UriRequest) -> UriPath {
        uri.path_for(&self.pattern)
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn pre_intercept(&mut self, interceptor: impl Into<PreRef>) -> &mut Self {
        self.pre.push(interceptor.into());
        self
    }

    pub fn post_intercept(&mut self, interceptor: impl Into<PostRef>) -> &mut Self {
        self.post.push(interceptor.into());
        self
    }

    pub fn https_only(&mut self) -> &mut Self {
        self.https_only = true;
        self
    }

    pub fn with_login_only(&mut self) -> &mut Self {
        self.login_only = true;
        self
    }

    pub fn with_role_only(&mut self, role: &str) -> &mut Self {
        self.role = Some(role.to_owned());
        self
    }

    pub fn supports_mime_type(&mut self, mime_type: &str) -> &mut Self {
        self.mime_types.add(mime_type.to_owned(), None);
        self
    }

    /// Supports `mime_type`, rendered by formatter `F` instead of the one
    /// bound for the MIME type.
    pub fn supports_mime_type_with<F: Formatter + 'static>(&mut self, mime_type: &str) -> &mut Self {
        self.mime_types.add(mime_type.to_owned(), Some(type_name::<F>().to_owned()));
        self
    }

    pub fn disable_content_negotiation(&mut self) -> &mut Self {
        self.mime_types.disable();
        self
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn pre_interceptors(&self) -> &[PreRef] { &self.pre }
    pub fn post_interceptors(&self) -> &[PostRef] { &self.post }
    pub fn supported_mime_types(&self) -> &SupportedMimeTypes { &self.mime_types }

    pub fn requires_https(&self) -> bool {
        self.https_only || self.handler.requirements().https
    }

    /// Login only, a required role, or a handler asking for either.
    pub fn requires_auth(&self) -> bool {
        self.requires_role() || self.login_only || self.handler.requirements().login
    }

    pub fn requires_role(&self) -> bool {
        self.required_role().is_some()
    }

    pub fn required_role(&self) -> Option<String> {
        self.role.clone().or_else(|| self.handler.requirements().role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Processor, Requirements};
    use crate::request::Request;
    use crate::response::Response;

    fn noop(_: &mut Request, _: &mut dyn Response, _: &UriPath) -> Result<()> {
        Ok(())
    }

    fn route(methods: &[Method]) -> Route {
        Route::new("/hello/{name}", noop, methods).unwrap()
    }

    fn uri(uri: &str, method: &str) -> UriRequest {
        UriRequest::from_string(uri, method).unwrap()
    }

    #[test]
    fn unknown_method_names_are_rejected() {
        assert!(matches!(
            Route::with_method_names("/hello", noop, &["GET", "FETCH"]),
            Err(Error::InvalidArgument(_)),
        ));
        let route = Route::with_method_names("/hello", noop, &["POST", "PUT"]).unwrap();
        assert_eq!(route.allowed_request_methods(), [Method::Post, Method::Put]);
    }

    #[test]
    fn invalid_path_is_rejected() {
        assert!(Route::new("/hello/(", noop, &[]).is_err());
    }

    #[test]
    fn no_methods_means_standard_set() {
        assert_eq!(route(&[]).allowed_request_methods(), Method::STANDARD);
        assert_eq!(route(&[Method::Get]).allowed_request_methods(), [Method::Get]);
    }

    #[test]
    fn matches_path_and_method() {
        let route = route(&[Method::Get]);
        assert!(route.matches(&uri("http://example.com/hello/world", "GET")));
        assert!(!route.matches(&uri("http://example.com/other", "GET")));
        assert!(!route.matches(&uri("http://example.com/hello/world", "POST")));
        assert!(route.matches_path(&uri("http://example.com/hello/world", "POST")));
        assert!(!route.matches_path(&uri("http://example.com/other", "GET")));
    }

    #[test]
    fn head_is_matched_by_get_routes() {
        assert!(route(&[Method::Get]).matches(&uri("http://example.com/hello/world", "HEAD")));
        assert!(!route(&[Method::Post]).matches(&uri("http://example.com/hello/world", "HEAD")));
    }

    #[test]
    fn unrestricted_route_does_not_match_options() {
        assert!(!route(&[]).matches(&uri("http://example.com/hello/world", "OPTIONS")));
        assert!(route(&[]).matches(&uri("http://example.com/hello/world", "DELETE")));
    }

    #[test]
    fn uri_path_extracts_arguments() {
        let path = route(&[]).uri_path(&uri("http://example.com/hello/world", "GET"));
        assert_eq!(path.argument("name"), Some("world"));
    }

    #[test]
    fn auth_requirements() {
        let mut route = route(&[]);
        assert!(!route.requires_auth());
        assert!(!route.requires_https());

        route.with_login_only();
        assert!(route.requires_auth());
        assert!(!route.requires_role());

        route.with_role_only("admin").https_only();
        assert!(route.requires_role());
        assert_eq!(route.required_role().as_deref(), Some("admin"));
        assert!(route.requires_https());
    }

    struct Guarded;

    impl Processor for Guarded {
        fn process(&self, _: &mut Request, _: &mut dyn Response, _: &UriPath) -> Result<()> {
            Ok(())
        }

        fn requirements(&self) -> Requirements {
            Requirements { https: true, login: true, role: Some("editor".into()) }
        }
    }

    #[test]
    fn handler_requirements_apply_when_route_is_silent() {
        let mut route = Route::new("/edit", Handler::instance(Guarded), &[]).unwrap();
        assert!(route.requires_https());
        assert!(route.requires_auth());
        assert_eq!(route.required_role().as_deref(), Some("editor"));

        route.with_role_only("admin");
        assert_eq!(route.required_role().as_deref(), Some("admin"));
    }

    #[test]
    fn mime_types_and_negotiation() {
        let mut route = route(&[]);
        route
            .supports_mime_type("application/json")
            .supports_mime_type_with::<crate::response::format::PlainTextFormatter>("text/csv");
        let mime_types = route.supported_mime_types();
        assert_eq!(mime_types.as_slice(), ["application/json", "text/csv"]);
        assert!(mime_types.provides_formatter("text/csv"));

        route.disable_content_negotiation();
        assert!(route.supported_mime_types().is_content_negotiation_disabled());
    }
}
