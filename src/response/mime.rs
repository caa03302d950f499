use std::collections::HashMap;

use crate::response::AcceptHeader;

/// MIME types a route (or the whole application) can respond with.
///
/// Order matters: with an empty `Accept` header the first type wins. A type
/// may name the formatter it should be rendered with; otherwise the
/// formatter bound for that MIME type in the injector is used.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SupportedMimeTypes {
    types: Vec<String>,
    formatters: HashMap<String, String>,
    disabled: bool,
}

impl SupportedMimeTypes {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut supported = Self::default();
        for mime_type in types {
            supported.add(mime_type.into(), None);
        }
        supported
    }

    /// Like [`new`](Self::new), with formatter type names for some types.
    pub fn with_formatters<I, S>(types: I, formatters: HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut supported = Self::new(types);
        supported.formatters = formatters;
        supported
    }

    /// Negotiation switched off: responses go out unformatted.
    pub fn disabled() -> Self {
        Self { disabled: true, ..Self::default() }
    }

    pub fn add(&mut self, mime_type: String, formatter: Option<String>) {
        if let Some(formatter) = formatter {
            self.formatters.insert(mime_type.clone(), formatter);
        }
        if !self.types.contains(&mime_type) {
            self.types.push(mime_type);
        }
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_content_negotiation_disabled(&self) -> bool {
        self.disabled
    }

    pub fn as_slice(&self) -> &[String] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Route types first, then the global ones not already listed. Route
    /// formatter overrides win. Disabled if either side is.
    pub fn merged(&self, global: &SupportedMimeTypes) -> Self {
        let mut merged = self.clone();
        for mime_type in &global.types {
            if !merged.types.contains(mime_type) {
                merged.types.push(mime_type.clone());
            }
        }
        for (mime_type, formatter) in &global.formatters {
            merged.formatters.entry(mime_type.clone()).or_insert_with(|| formatter.clone());
        }
        merged.disabled = self.disabled || global.disabled;
        merged
    }

    /// The type to respond with, or `None` when nothing supported is
    /// acceptable. An empty `Accept` header takes the first supported type.
    pub fn find_match(&self, accept: &AcceptHeader) -> Option<String> {
        if accept.is_empty() {
            return self.types.first().cloned();
        }
        accept.find_match_with_greatest_priority(&self.types)
    }

    pub fn provides_formatter(&self, mime_type: &str) -> bool {
        self.formatters.contains_key(mime_type)
    }

    /// Formatter type name configured for `mime_type`.
    pub fn formatter_for(&self, mime_type: &str) -> Option<&str> {
        self.formatters.get(mime_type).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_accept_takes_first_type() {
        let supported = SupportedMimeTypes::new(["application/json", "text/html"]);
        assert_eq!(supported.find_match(&AcceptHeader::default()).as_deref(), Some("application/json"));
        assert_eq!(SupportedMimeTypes::default().find_match(&AcceptHeader::default()), None);
    }

    #[test]
    fn merge_puts_route_types_first() {
        let route = SupportedMimeTypes::with_formatters(
            ["text/csv", "application/json"],
            HashMap::from([("text/csv".to_owned(), "CsvFormatter".to_owned())]),
        );
        let global = SupportedMimeTypes::with_formatters(
            ["application/json", "text/html"],
            HashMap::from([("text/csv".to_owned(), "Other".to_owned())]),
        );
        let merged = route.merged(&global);
        assert_eq!(merged.as_slice(), ["text/csv", "application/json", "text/html"]);
        assert_eq!(merged.formatter_for("text/csv"), Some("CsvFormatter"));
        assert!(!merged.provides_formatter("text/html"));
        assert!(!merged.is_content_negotiation_disabled());
    }

    #[test]
    fn disabled_on_either_side_disables() {
        let route = SupportedMimeTypes::new(["text/html"]);
        assert!(route.merged(&SupportedMimeTypes::disabled()).is_content_negotiation_disabled());
        assert!(SupportedMimeTypes::disabled().merged(&route).is_content_negotiation_disabled());
    }
}
