use std::sync::Arc;

use crate::error::Result;
use crate::response::format::Formatter;
use crate::response::{Body, Cookie, Headers, Output, Response};
use crate::status::Status;
use crate::version::HttpVersion;

/// Decorates a response with the negotiated [`Formatter`].
///
/// Structured bodies and the forbidden / not found / method not allowed /
/// internal error pages are rendered by the formatter; everything else goes
/// straight to the wrapped response. `Content-type` is added on send.
pub struct FormattingResponse {
    inner: Box<dyn Response>,
    formatter: Arc<dyn Formatter>,
    mime_type: String,
}

impl FormattingResponse {
    pub fn new(inner: Box<dyn Response>, formatter: Arc<dyn Formatter>, mime_type: impl Into<String>) -> Self {
        Self { inner, formatter, mime_type: mime_type.into() }
    }

    pub fn into_inner(self) -> Box<dyn Response> {
        self.inner
    }

    fn add_content_type(&mut self) {
        let value = self.mime_type.clone();
        self.inner.add_header("Content-type", &value);
    }
}

impl Response for FormattingResponse {
    fn version(&self) -> HttpVersion { self.inner.version() }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn set_status(&mut self, status: Status) {
        self.inner.set_status(status);
    }

    fn status(&self) -> Status { self.inner.status() }

    fn add_header(&mut self, name: &str, value: &str) {
        self.inner.add_header(name, value);
    }

    fn headers(&self) -> &Headers { self.inner.headers() }

    fn add_cookie(&mut self, cookie: Cookie) {
        self.inner.add_cookie(cookie);
    }

    fn remove_cookie(&mut self, name: &str) {
        self.inner.remove_cookie(name);
    }

    fn cookies(&self) -> &[Cookie] { self.inner.cookies() }

    fn write(&mut self, body: Body) {
        let body = match body {
            Body::Data(data) => Body::Text(self.formatter.format(&data, self.inner.headers())),
            text => text,
        };
        self.inner.write(body);
    }

    fn body(&self) -> Option<&str> { self.inner.body() }

    fn redirect(&mut self, uri: &str, status: Status) {
        self.inner.redirect(uri, status);
    }

    fn forbidden(&mut self) {
        self.inner.forbidden();
        self.inner.write(Body::Text(self.formatter.format_forbidden_error()));
    }

    fn not_found(&mut self) {
        self.inner.not_found();
        self.inner.write(Body::Text(self.formatter.format_not_found_error()));
    }

    fn method_not_allowed(&mut self, requested: &str, allowed: &[String]) {
        self.inner.method_not_allowed(requested, allowed);
        self.inner.write(Body::Text(self.formatter.format_method_not_allowed_error(requested, allowed)));
    }

    fn not_acceptable(&mut self, supported: &[String]) {
        self.inner.not_acceptable(supported);
    }

    fn internal_server_error(&mut self, message: &str) {
        let body = self.formatter.format_internal_server_error(message);
        self.inner.internal_server_error(&body);
    }

    fn http_version_not_supported(&mut self) {
        self.inner.http_version_not_supported();
    }

    fn is_fixed(&self) -> bool { self.inner.is_fixed() }

    fn mime_type(&self) -> Option<&str> {
        Some(&self.mime_type)
    }

    fn send(&mut self, out: &mut dyn Output) -> Result<()> {
        self.add_content_type();
        self.inner.send(out)
    }

    fn send_head(&mut self, out: &mut dyn Output) -> Result<()> {
        self.add_content_type();
        self.inner.send_head(out)
    }
}
