//! Routes as selected for one request.
//!
//! Every request ends up with exactly one [`ProcessableRoute`]: the route
//! that matched, or a synthetic one standing in when nothing did. The
//! pipeline drives all of them the same way: pre-interceptors, process,
//! post-interceptors, each step only if the previous one returned `true`.

use std::sync::Arc;

use crate::auth::AuthorizingRoute;
use crate::error::Result;
use crate::interceptor::Interceptors;
use crate::ioc::Injector;
use crate::request::Request;
use crate::response::{Response, SupportedMimeTypes};
use crate::route::Route;
use crate::session::request_injector;
use crate::uri::{UriPath, UriRequest};

pub trait ProcessableRoute {
    /// The request must be repeated over HTTPS.
    fn requires_https(&self) -> bool;

    /// Where to redirect when [`requires_https`](Self::requires_https).
    fn https_uri(&self) -> String;

    fn supported_mime_types(&self) -> &SupportedMimeTypes;

    fn apply_pre_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;

    fn process(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;

    fn apply_post_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;
}

// ── MatchingRoute ─────────────────────────────────────────────────────────────

/// A declared route that matched the request.
pub struct MatchingRoute<'a> {
    route: &'a Route,
    uri: UriRequest,
    interceptors: Interceptors,
    mime_types: SupportedMimeTypes,
    injector: Arc<dyn Injector>,
}

impl<'a> MatchingRoute<'a> {
    pub(crate) fn new(
        route: &'a Route,
        uri: UriRequest,
        interceptors: Interceptors,
        mime_types: SupportedMimeTypes,
        injector: Arc<dyn Injector>,
    ) -> Self {
        Self { route, uri, interceptors, mime_types, injector }
    }

    pub fn route(&self) -> &'a Route {
        self.route
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    pub fn uri_path(&self) -> UriPath {
        self.route.uri_path(&self.uri)
    }
}

impl ProcessableRoute for MatchingRoute<'_> {
    fn requires_https(&self) -> bool {
        !self.uri.is_https() && self.route.requires_https()
    }

    fn https_uri(&self) -> String {
        self.uri.to_https()
    }

    fn supported_mime_types(&self) -> &SupportedMimeTypes {
        &self.mime_types
    }

    fn apply_pre_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        self.interceptors.pre_process(request, response)
    }

    fn process(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        let path = self.uri_path();
        let injector = request_injector(&self.injector, request);
        self.route.handler().invoke(&*injector, request, response, &path)
    }

    fn apply_post_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        self.interceptors.post_process(request, response)
    }
}

// ── Synthetic routes ──────────────────────────────────────────────────────────

/// What every synthetic route shares: the request and the global
/// interceptors and MIME types that still apply to it.
pub(crate) struct Fallback {
    uri: UriRequest,
    interceptors: Interceptors,
    mime_types: SupportedMimeTypes,
}

impl Fallback {
    pub(crate) fn new(uri: UriRequest, interceptors: Interceptors, mime_types: SupportedMimeTypes) -> Self {
        Self { uri, interceptors, mime_types }
    }
}

macro_rules! fallback_route {
    ($name:ident) => {
        impl $name {
            pub fn uri(&self) -> &UriRequest {
                &self.base.uri
            }
        }

        impl ProcessableRoute for $name {
            fn requires_https(&self) -> bool {
                false
            }

            fn https_uri(&self) -> String {
                self.base.uri.to_https()
            }

            fn supported_mime_types(&self) -> &SupportedMimeTypes {
                &self.base.mime_types
            }

            fn apply_pre_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
                self.base.interceptors.pre_process(request, response)
            }

            fn process(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
                self.respond(request, response);
                Ok(true)
            }

            fn apply_post_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
                self.base.interceptors.post_process(request, response)
            }
        }
    };
}

/// No route matches the request path: `404`.
pub struct MissingRoute {
    base: Fallback,
}

impl MissingRoute {
    pub(crate) fn new(base: Fallback) -> Self {
        Self { base }
    }

    fn respond(&self, _request: &mut Request, response: &mut dyn Response) {
        response.not_found();
    }
}

fallback_route!(MissingRoute);

/// Routes match the path but none allows the method: `405`.
pub struct MethodNotAllowedRoute {
    base: Fallback,
    allowed: Vec<String>,
}

impl MethodNotAllowedRoute {
    pub(crate) fn new(base: Fallback, allowed: Vec<String>) -> Self {
        Self { base, allowed }
    }

    pub fn allowed_methods(&self) -> &[String] {
        &self.allowed
    }

    fn respond(&self, request: &mut Request, response: &mut dyn Response) {
        response.method_not_allowed(request.method(), &self.allowed);
    }
}

fallback_route!(MethodNotAllowedRoute);

/// `OPTIONS` on a path some route serves: answers with `Allow`.
pub struct OptionsRoute {
    base: Fallback,
    allowed: Vec<String>,
}

impl OptionsRoute {
    pub(crate) fn new(base: Fallback, allowed: Vec<String>) -> Self {
        Self { base, allowed }
    }

    pub fn allowed_methods(&self) -> &[String] {
        &self.allowed
    }

    fn respond(&self, _request: &mut Request, response: &mut dyn Response) {
        response.add_header("Allow", &self.allowed.join(", "));
    }
}

fallback_route!(OptionsRoute);

/// The matched route requires authentication but the application has no
/// auth handler. Always ends in `500`; no interceptor runs.
pub struct InternalServerErrorRoute {
    uri: UriRequest,
    mime_types: SupportedMimeTypes,
    message: String,
}

impl InternalServerErrorRoute {
    pub(crate) fn new(uri: UriRequest, mime_types: SupportedMimeTypes, message: impl Into<String>) -> Self {
        Self { uri, mime_types, message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ProcessableRoute for InternalServerErrorRoute {
    fn requires_https(&self) -> bool {
        false
    }

    fn https_uri(&self) -> String {
        self.uri.to_https()
    }

    fn supported_mime_types(&self) -> &SupportedMimeTypes {
        &self.mime_types
    }

    fn apply_pre_interceptors(&mut self, _: &mut Request, _: &mut dyn Response) -> Result<bool> {
        Ok(true)
    }

    fn process(&mut self, _: &mut Request, response: &mut dyn Response) -> Result<bool> {
        response.internal_server_error(&self.message);
        Ok(false)
    }

    fn apply_post_interceptors(&mut self, _: &mut Request, _: &mut dyn Response) -> Result<bool> {
        Ok(false)
    }
}

// ── SelectedRoute ─────────────────────────────────────────────────────────────

/// The route [`Routing::find_route`](crate::Routing::find_route) picked.
pub enum SelectedRoute<'a> {
    Matching(MatchingRoute<'a>),
    Authorizing(AuthorizingRoute<MatchingRoute<'a>>),
    Missing(MissingRoute),
    MethodNotAllowed(MethodNotAllowedRoute),
    Options(OptionsRoute),
    InternalServerError(InternalServerErrorRoute),
}

impl SelectedRoute<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Matching(_) => "matching",
            Self::Authorizing(_) => "authorizing",
            Self::Missing(_) => "missing",
            Self::MethodNotAllowed(_) => "method-not-allowed",
            Self::Options(_) => "options",
            Self::InternalServerError(_) => "internal-server-error",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $route:ident => $body:expr) => {
        match $self {
            SelectedRoute::Matching($route) => $body,
            SelectedRoute::Authorizing($route) => $body,
            SelectedRoute::Missing($route) => $body,
            SelectedRoute::MethodNotAllowed($route) => $body,
            SelectedRoute::Options($route) => $body,
            SelectedRoute::InternalServerError($route) => $body,
        }
    };
}

impl ProcessableRoute for SelectedRoute<'_> {
    fn requires_https(&self) -> bool {
        dispatch!(self, r => r.requires_https())
    }

    fn https_uri(&self) -> String {
        dispatch!(self, r => r.https_uri())
    }

    fn supported_mime_types(&self) -> &SupportedMimeTypes {
        dispatch!(self, r => r.supported_mime_types())
    }

    fn apply_pre_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        dispatch!(self, r => r.apply_pre_interceptors(request, response))
    }

    fn process(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        dispatch!(self, r => r.process(request, response))
    }

    fn apply_post_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        dispatch!(self, r => r.apply_post_interceptors(request, response))
    }
}
