//! Body formatters.
//!
//! A [`Formatter`] turns structured data into the negotiated representation
//! and renders the standard error pages in that same representation.

mod html;
mod json;
mod plain;
mod xml;

pub use html::HtmlFormatter;
pub use json::JsonFormatter;
pub use plain::PlainTextFormatter;
pub use xml::XmlFormatter;

use crate::response::Headers;

pub trait Formatter: Send + Sync {
    /// Renders `data`. `headers` are the response headers so far.
    fn format(&self, data: &serde_json::Value, headers: &Headers) -> String;

    fn format_forbidden_error(&self) -> String;
    fn format_not_found_error(&self) -> String;
    fn format_method_not_allowed_error(&self, requested: &str, allowed: &[String]) -> String;
    fn format_internal_server_error(&self, message: &str) -> String;
}

// Error texts shared by the non-HTML formatters.

pub(crate) const FORBIDDEN: &str = "You are not allowed to access this resource.";
pub(crate) const NOT_FOUND: &str = "Given resource could not be found.";

pub(crate) fn method_not_allowed_text(requested: &str, allowed: &[String]) -> String {
    format!(
        "The given request method {requested} is not valid. Please use one of {}.",
        allowed.join(", "),
    )
}

pub(crate) fn internal_server_error_text(message: &str) -> String {
    format!("Internal Server Error: {message}")
}
