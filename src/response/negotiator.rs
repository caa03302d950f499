use std::sync::Arc;

use tracing::debug;

use crate::ioc::{self, FORMATTER, Injector};
use crate::request::Request;
use crate::response::format::Formatter;
use crate::response::{AcceptHeader, FormattingResponse, Response, SupportedMimeTypes, WebResponse};

/// Picks the protocol version and the representation of a response.
pub struct ResponseNegotiator {
    injector: Arc<dyn Injector>,
}

impl ResponseNegotiator {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self { injector }
    }

    /// The base response for `request`. Protocol versions other than
    /// HTTP/1.0 and HTTP/1.1 yield a fixed 505 response.
    pub fn negotiate_http_version(request: &Request) -> Box<dyn Response> {
        let version = request.version();
        if version.is_supported() {
            return Box::new(WebResponse::new(version));
        }

        debug!(%version, "unsupported protocol version");
        let mut response = WebResponse::default();
        response.http_version_not_supported();
        Box::new(response)
    }

    /// Wraps `response` in a [`FormattingResponse`] for the best MIME type
    /// both the client and `supported` agree on.
    ///
    /// Returns `response` untouched when negotiation is disabled or nothing
    /// is supported. When the client accepts none of the supported types the
    /// response comes back fixed with `406`; when no formatter exists for
    /// the chosen type it comes back fixed with `500`.
    pub fn negotiate_mime_type(
        &self,
        request: &Request,
        mut response: Box<dyn Response>,
        supported: &SupportedMimeTypes,
    ) -> Box<dyn Response> {
        if supported.is_content_negotiation_disabled() || supported.is_empty() {
            return response;
        }

        let accept = request.header("accept").map(AcceptHeader::parse).unwrap_or_default();
        let Some(mime_type) = supported.find_match(&accept) else {
            debug!(accept = ?request.header("accept"), "no acceptable mime type");
            response.not_acceptable(supported.as_slice());
            return response;
        };

        match self.formatter_for(&mime_type, supported) {
            Some(formatter) => Box::new(FormattingResponse::new(response, formatter, mime_type)),
            None => {
                response.internal_server_error(&format!(
                    "No formatter defined for negotiated content type {mime_type}"
                ));
                response
            }
        }
    }

    fn formatter_for(&self, mime_type: &str, supported: &SupportedMimeTypes) -> Option<Arc<dyn Formatter>> {
        let resolved = match supported.formatter_for(mime_type) {
            Some(type_name) => ioc::resolve::<dyn Formatter>(&*self.injector, type_name, None),
            None if self.injector.has_binding(FORMATTER, Some(mime_type)) => {
                ioc::resolve::<dyn Formatter>(&*self.injector, FORMATTER, Some(mime_type))
            }
            None => return None,
        };

        match resolved {
            Ok(formatter) => formatter,
            Err(e) => {
                debug!(%mime_type, "{e}");
                None
            }
        }
    }
}
