//! Response assembly and content negotiation.
//!
//! A [`Response`] collects status, headers, cookies and a body while a
//! request moves through the pipeline, then writes all of it to an
//! [`Output`] in one go. Some setters are *terminal*: `forbidden`,
//! `not_found`, `method_not_allowed`, `not_acceptable`,
//! `internal_server_error` and `http_version_not_supported` mark the
//! response as fixed, after which the pipeline stops and the response is
//! sent as is. [`Response::clear`] reopens it.
//!
//! ```text
//!            set_status / add_header / write / redirect
//!          ┌──────────┐
//!          ▼          │
//!       ┌──────┐──────┘   forbidden, not_found, …   ┌───────┐
//!  ────►│ open │──────────────────────────────────►│ fixed │
//!       └──────┘◄──────────────────────────────────└───────┘
//!                            clear()
//! ```
//!
//! [`WebResponse`] is the plain implementation. [`FormattingResponse`]
//! decorates another response and runs structured bodies and error pages
//! through the [`Formatter`](format::Formatter) chosen by the
//! [`ResponseNegotiator`].

mod accept;
mod cookie;
mod formatting;
mod headers;
mod mime;
mod negotiator;
mod web;

pub mod format;

pub use accept::AcceptHeader;
pub use cookie::Cookie;
pub use formatting::FormattingResponse;
pub use headers::Headers;
pub use mime::SupportedMimeTypes;
pub use negotiator::ResponseNegotiator;
pub use web::WebResponse;

use crate::error::Result;
use crate::status::Status;
use crate::version::HttpVersion;

// ── Body ──────────────────────────────────────────────────────────────────────

/// What a processor hands to [`Response::write`].
///
/// Text is sent as is. Data is turned into text by the negotiated
/// formatter, or rendered as JSON when no formatter is in place.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Text(String),
    Data(serde_json::Value),
}

impl From<&str> for Body {
    fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Body {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<serde_json::Value> for Body {
    fn from(v: serde_json::Value) -> Self { Self::Data(v) }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Destination a response is written to.
///
/// Calls arrive in order: one `status_line`, any number of `header`s, then
/// exactly one `finish`.
pub trait Output {
    fn status_line(&mut self, version: HttpVersion, status: Status) -> Result<()>;
    fn header(&mut self, name: &str, value: &str) -> Result<()>;
    fn finish(&mut self, body: Option<&[u8]>) -> Result<()>;
}

/// Raw HTTP/1.x wire format, handy for tests and for logging.
impl Output for Vec<u8> {
    fn status_line(&mut self, version: HttpVersion, status: Status) -> Result<()> {
        self.extend_from_slice(format!("HTTP/{version} {} {}\r\n", status.code(), status.reason()).as_bytes());
        Ok(())
    }

    fn header(&mut self, name: &str, value: &str) -> Result<()> {
        self.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        Ok(())
    }

    fn finish(&mut self, body: Option<&[u8]>) -> Result<()> {
        self.extend_from_slice(b"\r\n");
        if let Some(body) = body {
            self.extend_from_slice(body);
        }
        Ok(())
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// A response under construction. Owned by exactly one request.
pub trait Response: Send {
    fn version(&self) -> HttpVersion;

    /// Back to a fresh `200 OK` without headers, cookies or body. The
    /// protocol version survives.
    fn clear(&mut self);

    fn set_status(&mut self, status: Status);
    fn status(&self) -> Status;

    /// Sets a header, replacing an earlier one with the same name.
    fn add_header(&mut self, name: &str, value: &str);
    fn headers(&self) -> &Headers;

    /// `value == None` checks only for presence.
    fn contains_header(&self, name: &str, value: Option<&str>) -> bool {
        match (self.headers().get(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        }
    }

    /// Sets a cookie, replacing an earlier one with the same name.
    fn add_cookie(&mut self, cookie: Cookie);

    /// Tells the client to drop the cookie `name`.
    fn remove_cookie(&mut self, name: &str);
    fn cookies(&self) -> &[Cookie];

    fn contains_cookie(&self, name: &str, value: Option<&str>) -> bool {
        self.cookies().iter().any(|c| c.name() == name && value.is_none_or(|v| c.value() == v))
    }

    /// Replaces the body.
    fn write(&mut self, body: Body);
    fn body(&self) -> Option<&str>;

    /// Sets `Location` and `status`. Does not fix the response.
    fn redirect(&mut self, uri: &str, status: Status);

    fn forbidden(&mut self);
    fn not_found(&mut self);
    fn method_not_allowed(&mut self, requested: &str, allowed: &[String]);
    fn not_acceptable(&mut self, supported: &[String]);
    fn internal_server_error(&mut self, message: &str);
    fn http_version_not_supported(&mut self);

    fn is_fixed(&self) -> bool;

    /// MIME type chosen by content negotiation, if any.
    fn mime_type(&self) -> Option<&str> {
        None
    }

    fn send(&mut self, out: &mut dyn Output) -> Result<()>;

    /// Like [`send`](Response::send) but without the body. `Content-Length`
    /// still reflects it.
    fn send_head(&mut self, out: &mut dyn Output) -> Result<()>;
}
