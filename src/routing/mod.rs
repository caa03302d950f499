//! The routing table and route selection.
//!
//! Routes are tried in registration order; the first one whose path and
//! method match wins. No radix tree, no specificity ranking: patterns are
//! prefix-matching regular expressions, so `/hello` registered before
//! `/hello/{name}` shadows it. Register the specific routes first.
//!
//! When no route matches, [`Routing::find_route`] still returns something
//! processable:
//!
//! | Situation                                   | Selected route               |
//! |---------------------------------------------|------------------------------|
//! | path and method match                       | matching (maybe authorizing) |
//! | `OPTIONS`, path matches some route          | options                      |
//! | path matches, method does not               | method not allowed (`405`)   |
//! | nothing matches the path                    | missing (`404`)              |
//! | auth required but no [`AuthHandler`] set    | internal server error        |

mod processable;

pub use processable::{
    InternalServerErrorRoute, MatchingRoute, MethodNotAllowedRoute, MissingRoute, OptionsRoute,
    ProcessableRoute, SelectedRoute,
};

use std::sync::Arc;

use tracing::debug;

use crate::auth::{AuthHandler, AuthorizingRoute};
use crate::error::Result;
use crate::handler::Handler;
use crate::interceptor::{Interceptors, PostRef, PreRef};
use crate::ioc::Injector;
use crate::method::Method;
use crate::response::SupportedMimeTypes;
use crate::route::Route;
use crate::uri::{PathPattern, UriRequest};

use processable::Fallback;

const NO_AUTH_HANDLER: &str =
    "Requested route requires authorization, but no auth handler defined for application";

/// A global interceptor, optionally limited to one method and/or path.
#[derive(Clone, Debug)]
struct Scoped<T> {
    method: Option<Method>,
    path: Option<PathPattern>,
    interceptor: T,
}

impl<T> Scoped<T> {
    fn applies_to(&self, uri: &UriRequest) -> bool {
        uri.method_equals(self.method.map(Method::as_str))
            && self.path.as_ref().is_none_or(|p| uri.satisfies_pattern(p))
    }
}

/// The application's routes, global interceptors and MIME types.
///
/// Built once at startup, then shared read-only. The `on_*` shortcuts
/// return the new [`Route`] for further configuration:
///
/// ```rust
/// use std::sync::Arc;
/// use switchyard::{Bindings, Request, Response, Routing, UriPath};
///
/// fn hello(_: &mut Request, res: &mut dyn Response, path: &UriPath) -> switchyard::Result<()> {
///     res.write(format!("Hello {}", path.argument_or("name", "world")).into());
///     Ok(())
/// }
///
/// let mut routing = Routing::new(Arc::new(Bindings::new()));
/// routing.on_get("/hello/{name}", hello).supports_mime_type("text/plain");
/// routing.on_post("/admin", hello).with_role_only("admin");
/// ```
pub struct Routing {
    injector: Arc<dyn Injector>,
    routes: Vec<Route>,
    pre: Vec<Scoped<PreRef>>,
    post: Vec<Scoped<PostRef>>,
    mime_types: SupportedMimeTypes,
    auth_handler: Option<Arc<dyn AuthHandler>>,
}

impl Routing {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self {
            injector,
            routes: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
            mime_types: SupportedMimeTypes::default(),
            auth_handler: None,
        }
    }

    pub fn injector(&self) -> &Arc<dyn Injector> {
        &self.injector
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    // ── Route registration ────────────────────────────────────────────────────

    /// Registers a route for `GET` requests (and therefore `HEAD`).
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern; use [`add_route`](Self::add_route)
    /// for patterns not known at compile time.
    pub fn on_get(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[Method::Get])
    }

    pub fn on_head(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[Method::Head])
    }

    pub fn on_post(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[Method::Post])
    }

    pub fn on_put(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[Method::Put])
    }

    pub fn on_delete(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[Method::Delete])
    }

    /// Registers a route for the [standard methods](Method::STANDARD).
    pub fn on_all(&mut self, path: &str, handler: impl Into<Handler>) -> &mut Route {
        self.add(path, handler, &[])
    }

    /// Registers a route for the named methods. Fails on unknown method
    /// names or an invalid path pattern.
    pub fn on(&mut self, path: &str, handler: impl Into<Handler>, methods: &[&str]) -> Result<&mut Route> {
        Ok(self.add_route(Route::with_method_names(path, handler, methods)?))
    }

    /// Appends an already built route.
    pub fn add_route(&mut self, route: Route) -> &mut Route {
        self.routes.push(route);
        let idx = self.routes.len() - 1;
        &mut self.routes[idx]
    }

    fn add(&mut self, path: &str, handler: impl Into<Handler>, methods: &[Method]) -> &mut Route {
        let route = Route::new(path, handler, methods)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self.add_route(route)
    }

    // ── Global configuration ──────────────────────────────────────────────────

    /// Pre-interceptor for every request, matched or not.
    pub fn pre_intercept(&mut self, interceptor: impl Into<PreRef>) -> &mut Self {
        self.pre.push(Scoped { method: None, path: None, interceptor: interceptor.into() });
        self
    }

    /// Pre-interceptor limited to `method` and/or requests satisfying `path`.
    pub fn pre_intercept_on(
        &mut self,
        method: Option<Method>,
        path: Option<&str>,
        interceptor: impl Into<PreRef>,
    ) -> Result<&mut Self> {
        let path = path.map(PathPattern::compile).transpose()?;
        self.pre.push(Scoped { method, path, interceptor: interceptor.into() });
        Ok(self)
    }

    pub fn post_intercept(&mut self, interceptor: impl Into<PostRef>) -> &mut Self {
        self.post.push(Scoped { method: None, path: None, interceptor: interceptor.into() });
        self
    }

    pub fn post_intercept_on(
        &mut self,
        method: Option<Method>,
        path: Option<&str>,
        interceptor: impl Into<PostRef>,
    ) -> Result<&mut Self> {
        let path = path.map(PathPattern::compile).transpose()?;
        self.post.push(Scoped { method, path, interceptor: interceptor.into() });
        Ok(self)
    }

    pub fn set_auth_handler(&mut self, auth_handler: Arc<dyn AuthHandler>) -> &mut Self {
        self.auth_handler = Some(auth_handler);
        self
    }

    /// MIME type every route supports, after its own.
    pub fn supports_mime_type(&mut self, mime_type: &str) -> &mut Self {
        self.mime_types.add(mime_type.to_owned(), None);
        self
    }

    pub fn disable_content_negotiation(&mut self) -> &mut Self {
        self.mime_types.disable();
        self
    }

    pub fn supported_mime_types(&self) -> &SupportedMimeTypes {
        &self.mime_types
    }

    // ── Selection ─────────────────────────────────────────────────────────────

    /// Selects the route for `uri`. Always returns a processable route.
    pub fn find_route(&self, uri: &UriRequest) -> SelectedRoute<'_> {
        if let Some(route) = self.routes.iter().find(|r| r.matches(uri)) {
            return self.select(route, uri);
        }

        let allowed = self.allowed_methods(uri);
        if allowed.is_empty() {
            debug!(%uri, method = uri.method(), "no route for path");
            return SelectedRoute::Missing(MissingRoute::new(self.fallback(uri)));
        }

        if uri.method() == Method::Options.as_str() {
            let mut allowed = allowed;
            allowed.push(Method::Options.as_str().to_owned());
            return SelectedRoute::Options(OptionsRoute::new(self.fallback(uri), allowed));
        }

        debug!(%uri, method = uri.method(), "method not allowed");
        SelectedRoute::MethodNotAllowed(MethodNotAllowedRoute::new(self.fallback(uri), allowed))
    }

    fn select<'a>(&'a self, route: &'a Route, uri: &UriRequest) -> SelectedRoute<'a> {
        let mime_types = route.supported_mime_types().merged(&self.mime_types);

        if route.requires_auth() && self.auth_handler.is_none() {
            return SelectedRoute::InternalServerError(InternalServerErrorRoute::new(
                uri.clone(),
                mime_types,
                NO_AUTH_HANDLER,
            ));
        }

        let pre = self.global_pre(uri).chain(route.pre_interceptors().iter().cloned()).collect();
        let post = self.global_post(uri).chain(route.post_interceptors().iter().cloned()).collect();
        let matching = MatchingRoute::new(
            route,
            uri.clone(),
            Interceptors::new(Arc::clone(&self.injector), pre, post),
            mime_types,
            Arc::clone(&self.injector),
        );

        match &self.auth_handler {
            Some(auth_handler) if route.requires_auth() => SelectedRoute::Authorizing(AuthorizingRoute::new(
                matching,
                Arc::clone(auth_handler),
                route.required_role(),
            )),
            _ => SelectedRoute::Matching(matching),
        }
    }

    /// Methods of all routes whose path matches, deduplicated, in
    /// registration order.
    fn allowed_methods(&self, uri: &UriRequest) -> Vec<String> {
        let mut allowed: Vec<String> = Vec::new();
        for route in self.routes.iter().filter(|r| r.matches_path(uri)) {
            for method in route.allowed_request_methods() {
                if !allowed.iter().any(|m| m == method.as_str()) {
                    allowed.push(method.as_str().to_owned());
                }
            }
        }
        allowed
    }

    fn global_pre<'a>(&'a self, uri: &'a UriRequest) -> impl Iterator<Item = PreRef> + 'a {
        self.pre.iter().filter(|s| s.applies_to(uri)).map(|s| s.interceptor.clone())
    }

    fn global_post<'a>(&'a self, uri: &'a UriRequest) -> impl Iterator<Item = PostRef> + 'a {
        self.post.iter().filter(|s| s.applies_to(uri)).map(|s| s.interceptor.clone())
    }

    fn fallback(&self, uri: &UriRequest) -> Fallback {
        let interceptors = Interceptors::new(
            Arc::clone(&self.injector),
            self.global_pre(uri).collect(),
            self.global_post(uri).collect(),
        );
        Fallback::new(uri.clone(), interceptors, self.mime_types.clone())
    }
}
