//! The request pipeline.
//!
//! One call to [`WebApp::run`] takes a request from the wire to a finished
//! response:
//!
//! 1. pick the base response for the protocol version,
//! 2. attach the session, if sessions are enabled,
//! 3. select the route,
//! 4. negotiate the MIME type,
//! 5. redirect to HTTPS when the route asks for it,
//! 6. run pre-interceptors, the processor and post-interceptors.
//!
//! Each step after the first only runs while the response is not fixed.
//! Errors returned by interceptors or processors never escape: they are
//! logged and the response becomes a `500` carrying the error message.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::Result;
use crate::request::Request;
use crate::response::{Output, Response, ResponseNegotiator};
use crate::routing::{ProcessableRoute, Routing};
use crate::session::MemorySessions;
use crate::status::Status;

/// A configured application, ready to serve requests.
///
/// Cheap to share: the server adapter keeps one behind an `Arc` and runs
/// it from many threads at once.
pub struct WebApp {
    routing: Arc<Routing>,
    negotiator: ResponseNegotiator,
    sessions: Option<MemorySessions>,
}

impl WebApp {
    pub fn new(routing: Routing) -> Self {
        let negotiator = ResponseNegotiator::new(Arc::clone(routing.injector()));
        Self { routing: Arc::new(routing), negotiator, sessions: None }
    }

    /// Enables sessions. Every request gets one attached to its extensions.
    pub fn with_sessions(mut self, sessions: MemorySessions) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn sessions(&self) -> Option<&MemorySessions> {
        self.sessions.as_ref()
    }

    /// Runs the pipeline and returns the response without sending it.
    pub fn run(&self, request: &mut Request) -> Box<dyn Response> {
        let mut response = ResponseNegotiator::negotiate_http_version(request);
        if response.is_fixed() {
            return response;
        }

        if let Some(sessions) = &self.sessions {
            sessions.attach(request, &mut *response);
        }

        let uri = request.uri_request();
        let mut route = self.routing.find_route(&uri);
        debug!(%uri, method = uri.method(), route = route.kind(), "route selected");

        let mut response = self.negotiator.negotiate_mime_type(request, response, route.supported_mime_types());
        if response.is_fixed() {
            return response;
        }

        if route.requires_https() {
            response.redirect(&route.https_uri(), Status::Found);
            return response;
        }

        if let Err(e) = Self::process(&mut route, request, &mut *response) {
            error!(%uri, method = uri.method(), "request failed: {e}");
            response.internal_server_error(&e.to_string());
        }
        response
    }

    /// Runs the pipeline and sends the response to `out`. `HEAD` requests
    /// get the head only.
    pub fn respond(&self, request: &mut Request, out: &mut dyn Output) -> Result<()> {
        let mut response = self.run(request);
        if request.method() == "HEAD" {
            response.send_head(out)
        } else {
            response.send(out)
        }
    }

    fn process(route: &mut dyn ProcessableRoute, request: &mut Request, response: &mut dyn Response) -> Result<()> {
        if route.apply_pre_interceptors(request, response)? && route.process(request, response)? {
            route.apply_post_interceptors(request, response)?;
        }
        Ok(())
    }
}
