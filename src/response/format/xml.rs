use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Value, json};
use tracing::error;

use super::{FORBIDDEN, Formatter, NOT_FOUND, internal_server_error_text, method_not_allowed_text};
use crate::response::Headers;

/// `text/xml`, `application/xml` and `application/rss+xml`.
///
/// Objects become one child element per key, arrays repeat `<item>`, and
/// `null` is an empty element. Keys that are not valid element names have
/// the offending characters replaced by `_`. Errors render as
/// `<result><error>…</error></result>`.
#[derive(Clone, Debug)]
pub struct XmlFormatter {
    root: String,
}

impl XmlFormatter {
    pub fn new() -> Self {
        Self { root: "result".to_owned() }
    }

    /// Name of the document element, `result` by default.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = element_name(&root.into());
        self
    }

    fn serialize(&self, data: &Value) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let written = writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .ok()
            .and_then(|()| write_value(&mut writer, &self.root, data));
        if written.is_none() {
            error!("failed to serialize XML document");
            return String::new();
        }
        String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned()
    }

    fn error(&self, message: &str) -> String {
        self.serialize(&json!({ "error": message }))
    }
}

impl Default for XmlFormatter {
    fn default() -> Self { Self::new() }
}

fn write_value(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &Value) -> Option<()> {
    let text = match value {
        Value::Null => return writer.write_event(Event::Empty(BytesStart::new(name))).ok(),
        Value::Object(fields) => {
            writer.write_event(Event::Start(BytesStart::new(name))).ok()?;
            for (key, field) in fields {
                write_value(writer, &element_name(key), field)?;
            }
            return writer.write_event(Event::End(BytesEnd::new(name))).ok();
        }
        Value::Array(items) => {
            writer.write_event(Event::Start(BytesStart::new(name))).ok()?;
            for item in items {
                write_value(writer, "item", item)?;
            }
            return writer.write_event(Event::End(BytesEnd::new(name))).ok();
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    writer.write_event(Event::Start(BytesStart::new(name))).ok()?;
    writer.write_event(Event::Text(BytesText::new(&text))).ok()?;
    writer.write_event(Event::End(BytesEnd::new(name))).ok()
}

fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

impl Formatter for XmlFormatter {
    fn format(&self, data: &Value, _headers: &Headers) -> String {
        self.serialize(data)
    }

    fn format_forbidden_error(&self) -> String {
        self.error(FORBIDDEN)
    }

    fn format_not_found_error(&self) -> String {
        self.error(NOT_FOUND)
    }

    fn format_method_not_allowed_error(&self, requested: &str, allowed: &[String]) -> String {
        self.error(&method_not_allowed_text(requested, allowed))
    }

    fn format_internal_server_error(&self, message: &str) -> String {
        self.error(&internal_server_error_text(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

    #[test]
    fn objects_and_arrays() {
        let xml = XmlFormatter::new().format(&json!({"name": "world", "tags": ["a", "b"], "gone": null}), &Headers::new());
        assert_eq!(
            xml,
            format!("{DECL}<result><gone/><name>world</name><tags><item>a</item><item>b</item></tags></result>"),
        );
    }

    #[test]
    fn text_is_escaped_and_names_sanitized() {
        let xml = XmlFormatter::new()
            .with_root("user list")
            .format(&json!({"1st key": "<b>&</b>"}), &Headers::new());
        assert_eq!(xml, format!("{DECL}<user_list><_1st_key>&lt;b&gt;&amp;&lt;/b&gt;</_1st_key></user_list>"));
    }

    #[test]
    fn scalars_become_text() {
        assert_eq!(XmlFormatter::new().format(&json!(42), &Headers::new()), format!("{DECL}<result>42</result>"));
    }

    #[test]
    fn error_bodies() {
        assert_eq!(
            XmlFormatter::new().format_not_found_error(),
            format!("{DECL}<result><error>Given resource could not be found.</error></result>"),
        );
        assert_eq!(
            XmlFormatter::new().format_method_not_allowed_error("POST", &["GET".into()]),
            format!("{DECL}<result><error>The given request method POST is not valid. Please use one of GET.</error></result>"),
        );
        assert!(XmlFormatter::new().format_internal_server_error("x < y").contains("Internal Server Error: x &lt; y"));
    }
}
