//! Ordered response header list.

/// Response headers in insertion order.
///
/// Names compare case-insensitively and a second `put` for the same name
/// replaces the earlier value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_owned(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ── Well-known headers ────────────────────────────────────────────────────

    pub fn location(&mut self, uri: &str) -> &mut Self {
        self.put("Location", uri)
    }

    pub fn allow(&mut self, methods: &[String]) -> &mut Self {
        self.put("Allow", methods.join(", "))
    }

    /// `X-Acceptable` listing the supported MIME types; skipped when empty.
    pub fn acceptable(&mut self, mime_types: &[String]) -> &mut Self {
        if mime_types.is_empty() {
            return self;
        }
        self.put("X-Acceptable", mime_types.join(", "))
    }

    pub fn force_download(&mut self, filename: &str) -> &mut Self {
        self.put("Content-Disposition", format!("attachment; filename={filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn location_header() {
        let mut headers = Headers::new();
        headers.location("http://example.com/");
        assert_eq!(headers.get("Location"), Some("http://example.com/"));
    }

    #[test]
    fn later_put_replaces_in_place() {
        let mut headers = Headers::new();
        headers.put("X-A", "1").put("X-B", "2").put("x-a", "3");
        let all: Vec<_> = headers.iter().collect();
        assert_eq!(all, vec![("X-A", "3"), ("X-B", "2")]);
    }

    #[test]
    fn allow_and_acceptable() {
        let mut headers = Headers::new();
        headers.allow(&strings(&["POST", "PUT"])).acceptable(&[]);
        assert_eq!(headers.get("allow"), Some("POST, PUT"));
        assert!(!headers.contains("X-Acceptable"));

        headers.acceptable(&strings(&["text/plain", "application/json"]));
        assert_eq!(headers.get("X-Acceptable"), Some("text/plain, application/json"));
    }

    #[test]
    fn force_download() {
        let mut headers = Headers::new();
        headers.force_download("report.csv");
        assert_eq!(headers.get("Content-Disposition"), Some("attachment; filename=report.csv"));
        assert_eq!(headers.remove("content-disposition").as_deref(), Some("attachment; filename=report.csv"));
        assert!(headers.is_empty());
    }
}
