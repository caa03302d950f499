use serde_json::Value;

use super::{FORBIDDEN, Formatter, NOT_FOUND, internal_server_error_text, method_not_allowed_text};
use crate::response::Headers;

/// `text/plain`. Strings go out verbatim, anything else as pretty JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextFormatter;

impl Formatter for PlainTextFormatter {
    fn format(&self, data: &Value, _headers: &Headers) -> String {
        match data {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    fn format_forbidden_error(&self) -> String {
        FORBIDDEN.to_owned()
    }

    fn format_not_found_error(&self) -> String {
        NOT_FOUND.to_owned()
    }

    fn format_method_not_allowed_error(&self, requested: &str, allowed: &[String]) -> String {
        method_not_allowed_text(requested, allowed)
    }

    fn format_internal_server_error(&self, message: &str) -> String {
        internal_server_error_text(message)
    }
}
