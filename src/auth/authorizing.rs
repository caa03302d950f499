use std::sync::Arc;

use tracing::{error, warn};

use crate::auth::{AuthHandler, AuthHandlerError};
use crate::error::Result;
use crate::request::Request;
use crate::response::{Body, Response, SupportedMimeTypes};
use crate::routing::ProcessableRoute;
use crate::status::Status;

/// Guards a route behind the [`AuthHandler`].
///
/// [`apply_pre_interceptors`](ProcessableRoute::apply_pre_interceptors)
/// checks authentication, then the required role if any, and only then runs
/// the wrapped route's pre-interceptors:
///
/// | Outcome                      | Response                          |
/// |------------------------------|-----------------------------------|
/// | internal error               | `500` with the error message      |
/// | external error               | `503` with the error message      |
/// | not authenticated            | redirect to the login URI         |
/// | authenticated, role missing  | `403`                             |
///
/// `process` and `apply_post_interceptors` must only be called after the
/// pre-interceptors authorized the request. Called any earlier they do
/// nothing and report `false`.
pub struct AuthorizingRoute<R> {
    route: R,
    auth_handler: Arc<dyn AuthHandler>,
    role: Option<String>,
    authorized: bool,
}

impl<R: ProcessableRoute> AuthorizingRoute<R> {
    pub fn new(route: R, auth_handler: Arc<dyn AuthHandler>, role: Option<String>) -> Self {
        Self { route, auth_handler, role, authorized: false }
    }

    pub fn inner(&self) -> &R {
        &self.route
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn check(&self, request: &mut Request, response: &mut dyn Response) -> bool {
        match self.auth_handler.is_authenticated(request) {
            Ok(true) => {}
            Ok(false) => {
                response.redirect(&self.auth_handler.login_uri(request), Status::Found);
                return false;
            }
            Err(e) => {
                fail(response, e);
                return false;
            }
        }

        let Some(role) = &self.role else {
            return true;
        };
        match self.auth_handler.is_authorized(request, role) {
            Ok(true) => true,
            Ok(false) => {
                response.forbidden();
                false
            }
            Err(e) => {
                fail(response, e);
                false
            }
        }
    }
}

fn fail(response: &mut dyn Response, e: AuthHandlerError) {
    if e.is_internal() {
        error!("auth handler failed: {e}");
        response.internal_server_error(e.message());
    } else {
        warn!("auth backend unavailable: {e}");
        response.set_status(Status::ServiceUnavailable);
        response.write(Body::Text(e.message().to_owned()));
    }
}

impl<R: ProcessableRoute> ProcessableRoute for AuthorizingRoute<R> {
    fn requires_https(&self) -> bool {
        self.route.requires_https()
    }

    fn https_uri(&self) -> String {
        self.route.https_uri()
    }

    fn supported_mime_types(&self) -> &SupportedMimeTypes {
        self.route.supported_mime_types()
    }

    fn apply_pre_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        if !self.check(request, response) {
            return Ok(false);
        }
        self.authorized = true;
        self.route.apply_pre_interceptors(request, response)
    }

    fn process(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        if !self.authorized {
            warn!("process called on a request that was never authorized");
            return Ok(false);
        }
        self.route.process(request, response)
    }

    fn apply_post_interceptors(&mut self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        if !self.authorized {
            warn!("post interceptors called on a request that was never authorized");
            return Ok(false);
        }
        self.route.apply_post_interceptors(request, response)
    }
}
