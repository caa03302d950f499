use quick_xml::escape::escape;
use serde_json::Value;

use super::Formatter;
use crate::response::Headers;

const DEFAULT_TEMPLATE: &str =
    "<!DOCTYPE html><html><head><title>{TITLE}</title>{META}</head><body>{CONTENT}</body></html>";
const NOINDEX: &str = r#"<meta name="robots" content="noindex"/>"#;

/// `text/html` rendered into a page template.
///
/// The template carries `{TITLE}`, `{META}` and `{CONTENT}` placeholders;
/// a placeholder missing from a custom template is simply dropped. Data is
/// either a string (the content) or an object with `title`, `meta` and
/// `content` keys.
#[derive(Clone, Debug)]
pub struct HtmlFormatter {
    template: String,
    base_title: String,
}

impl HtmlFormatter {
    pub fn new() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_owned(), base_title: String::new() }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Prefixed to every page title, separated by a space.
    pub fn with_base_title(mut self, base_title: impl Into<String>) -> Self {
        self.base_title = base_title.into();
        self
    }

    fn render(&self, title: &str, meta: &str, content: &str) -> String {
        let title = match (self.base_title.is_empty(), title.is_empty()) {
            (true, _) => title.to_owned(),
            (false, true) => self.base_title.clone(),
            (false, false) => format!("{} {title}", self.base_title),
        };
        self.template
            .replace("{TITLE}", &title)
            .replace("{META}", meta)
            .replace("{CONTENT}", content)
    }

    /// `text` is escaped; it may carry request data or error messages.
    fn error_page(&self, title: &str, text: &str) -> String {
        self.render(title, NOINDEX, &format!("<h1>{title}</h1><p>{}</p>", escape(text)))
    }
}

impl Default for HtmlFormatter {
    fn default() -> Self { Self::new() }
}

impl Formatter for HtmlFormatter {
    fn format(&self, data: &Value, _headers: &Headers) -> String {
        let field = |key: &str| data.get(key).and_then(Value::as_str).unwrap_or_default();
        match data {
            Value::Object(_) => self.render(field("title"), field("meta"), field("content")),
            Value::String(content) => self.render("", "", content),
            Value::Null => self.render("", "", ""),
            other => self.render("", "", &other.to_string()),
        }
    }

    fn format_forbidden_error(&self) -> String {
        self.error_page("403 Forbidden", "You are not allowed to access this resource.")
    }

    fn format_not_found_error(&self) -> String {
        self.error_page("404 Not Found", "The requested resource could not be found.")
    }

    fn format_method_not_allowed_error(&self, requested: &str, allowed: &[String]) -> String {
        self.error_page(
            "405 Method Not Allowed",
            &format!(
                "The given request method {requested} is not valid. Please use one of {}.",
                allowed.join(", "),
            ),
        )
    }

    fn format_internal_server_error(&self, message: &str) -> String {
        self.error_page("500 Internal Server Error", message)
    }
}
