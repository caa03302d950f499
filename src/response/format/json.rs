use serde_json::{Value, json};

use super::{FORBIDDEN, Formatter, NOT_FOUND, internal_server_error_text, method_not_allowed_text};
use crate::response::Headers;

/// `application/json` via serde_json. Errors render as `{"error": "…"}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

fn error(message: &str) -> String {
    json!({ "error": message }).to_string()
}

impl Formatter for JsonFormatter {
    fn format(&self, data: &Value, _headers: &Headers) -> String {
        data.to_string()
    }

    fn format_forbidden_error(&self) -> String {
        error(FORBIDDEN)
    }

    fn format_not_found_error(&self) -> String {
        error(NOT_FOUND)
    }

    fn format_method_not_allowed_error(&self, requested: &str, allowed: &[String]) -> String {
        error(&method_not_allowed_text(requested, allowed))
    }

    fn format_internal_server_error(&self, message: &str) -> String {
        error(&internal_server_error_text(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_values_as_json() {
        let out = JsonFormatter.format(&json!({"name": "world", "n": [1, 2]}), &Headers::new());
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({"name": "world", "n": [1, 2]}));
    }

    #[test]
    fn error_bodies() {
        assert_eq!(
            JsonFormatter.format_forbidden_error(),
            r#"{"error":"You are not allowed to access this resource."}"#,
        );
        assert_eq!(
            JsonFormatter.format_not_found_error(),
            r#"{"error":"Given resource could not be found."}"#,
        );
        assert_eq!(
            JsonFormatter.format_method_not_allowed_error("POST", &["GET".into(), "HEAD".into()]),
            r#"{"error":"The given request method POST is not valid. Please use one of GET, HEAD."}"#,
        );
        assert_eq!(
            JsonFormatter.format_internal_server_error("ups"),
            r#"{"error":"Internal Server Error: ups"}"#,
        );
    }
}
