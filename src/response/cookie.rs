//! Response cookies.

use chrono::{DateTime, Utc};

/// A cookie to be set on the client via `Set-Cookie`.
///
/// ```rust
/// use switchyard::Cookie;
///
/// let cookie = Cookie::create("sid", "313")
///     .expiring_in(3600)
///     .for_path("/")
///     .restrict_to_ssl();
/// assert!(cookie.is_restricted_to_ssl());
/// assert!(cookie.is_http_only());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: i64,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// A session cookie (`expires == 0`), HTTP-only, without path or domain.
    pub fn create(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            expires: 0,
            path: None,
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    /// Expires at the given unix timestamp.
    pub fn expiring_at(mut self, timestamp: i64) -> Self {
        self.expires = timestamp;
        self
    }

    /// Expires `seconds` from now.
    pub fn expiring_in(self, seconds: i64) -> Self {
        self.expiring_at(Utc::now().timestamp() + seconds)
    }

    pub fn for_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    pub fn for_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_owned());
        self
    }

    pub fn restrict_to_ssl(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn disable_http_only(mut self) -> Self {
        self.http_only = false;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn value(&self) -> &str { &self.value }
    pub fn expiration(&self) -> i64 { self.expires }
    pub fn path(&self) -> Option<&str> { self.path.as_deref() }
    pub fn domain(&self) -> Option<&str> { self.domain.as_deref() }
    pub fn is_restricted_to_ssl(&self) -> bool { self.secure }
    pub fn is_http_only(&self) -> bool { self.http_only }

    /// Value of the `Set-Cookie` header for this cookie.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if self.expires != 0 {
            if let Some(at) = DateTime::<Utc>::from_timestamp(self.expires, 0) {
                out.push_str(&at.format("; expires=%a, %d %b %Y %H:%M:%S GMT").to_string());
            }
        }
        if let Some(path) = &self.path {
            out.push_str("; path=");
            out.push_str(path);
        }
        if let Some(domain) = &self.domain {
            out.push_str("; domain=");
            out.push_str(domain);
        }
        if self.secure {
            out.push_str("; secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cookie = Cookie::create("foo", "bar");
        assert_eq!(cookie.name(), "foo");
        assert_eq!(cookie.value(), "bar");
        assert_eq!(cookie.expiration(), 0);
        assert_eq!(cookie.path(), None);
        assert_eq!(cookie.domain(), None);
        assert!(!cookie.is_restricted_to_ssl());
        assert!(cookie.is_http_only());
        assert_eq!(cookie.header_value(), "foo=bar; HttpOnly");
    }

    #[test]
    fn expiring_in_is_relative_to_now() {
        let before = Utc::now().timestamp();
        let cookie = Cookie::create("foo", "bar").expiring_in(100);
        let after = Utc::now().timestamp();
        assert!(cookie.expiration() >= before + 100);
        assert!(cookie.expiration() <= after + 100);
    }

    #[test]
    fn header_value_with_all_attributes() {
        let cookie = Cookie::create("foo", "bar")
            .expiring_at(0x7fff_0000)
            .for_path("/app")
            .for_domain("example.com")
            .restrict_to_ssl()
            .disable_http_only();
        assert_eq!(
            cookie.header_value(),
            "foo=bar; expires=Mon, 18 Jan 2038 09:01:52 GMT; path=/app; domain=example.com; secure",
        );
    }
}
