use chrono::Utc;

use crate::error::Result;
use crate::response::{Body, Cookie, Headers, Output, Response};
use crate::status::Status;
use crate::version::HttpVersion;

const UNSUPPORTED_VERSION: &str = "Unsupported HTTP protocol version, expected HTTP/1.0 or HTTP/1.1";

/// The plain [`Response`] implementation.
#[derive(Debug)]
pub struct WebResponse {
    version: HttpVersion,
    status: Status,
    headers: Headers,
    cookies: Vec<Cookie>,
    body: Option<String>,
    fixed: bool,
}

impl WebResponse {
    pub fn new(version: HttpVersion) -> Self {
        Self {
            version,
            status: Status::Ok,
            headers: Headers::new(),
            cookies: Vec::new(),
            body: None,
            fixed: false,
        }
    }

    fn fix(&mut self, status: Status) {
        self.status = status;
        self.fixed = true;
    }

    fn send_with(&mut self, out: &mut dyn Output, include_body: bool) -> Result<()> {
        out.status_line(self.version, self.status)?;
        for (name, value) in self.headers.iter() {
            out.header(name, value)?;
        }
        for cookie in &self.cookies {
            out.header("Set-Cookie", &cookie.header_value())?;
        }

        match &self.body {
            Some(body) => {
                out.header("Content-Length", &body.len().to_string())?;
                out.finish(include_body.then_some(body.as_bytes()))
            }
            None => out.finish(None),
        }
    }
}

impl Default for WebResponse {
    fn default() -> Self { Self::new(HttpVersion::default()) }
}

impl Response for WebResponse {
    fn version(&self) -> HttpVersion { self.version }

    fn clear(&mut self) {
        *self = Self::new(self.version);
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn status(&self) -> Status { self.status }

    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.put(name, value);
    }

    fn headers(&self) -> &Headers { &self.headers }

    fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| c.name() != cookie.name());
        self.cookies.push(cookie);
    }

    fn remove_cookie(&mut self, name: &str) {
        self.add_cookie(Cookie::create(name, "remove").expiring_at(Utc::now().timestamp() - 86_400));
    }

    fn cookies(&self) -> &[Cookie] { &self.cookies }

    fn write(&mut self, body: Body) {
        self.body = Some(match body {
            Body::Text(text) => text,
            Body::Data(data) => data.to_string(),
        });
    }

    fn body(&self) -> Option<&str> { self.body.as_deref() }

    fn redirect(&mut self, uri: &str, status: Status) {
        self.headers.location(uri);
        self.status = status;
    }

    fn forbidden(&mut self) {
        self.fix(Status::Forbidden);
    }

    fn not_found(&mut self) {
        self.fix(Status::NotFound);
    }

    fn method_not_allowed(&mut self, _requested: &str, allowed: &[String]) {
        self.headers.allow(allowed);
        self.fix(Status::MethodNotAllowed);
    }

    fn not_acceptable(&mut self, supported: &[String]) {
        self.headers.acceptable(supported);
        self.fix(Status::NotAcceptable);
    }

    fn internal_server_error(&mut self, message: &str) {
        self.body = Some(message.to_owned());
        self.fix(Status::InternalServerError);
    }

    fn http_version_not_supported(&mut self) {
        self.body = Some(UNSUPPORTED_VERSION.to_owned());
        self.fix(Status::HttpVersionNotSupported);
    }

    fn is_fixed(&self) -> bool { self.fixed }

    fn send(&mut self, out: &mut dyn Output) -> Result<()> {
        self.send_with(out, true)
    }

    fn send_head(&mut self, out: &mut dyn Output) -> Result<()> {
        self.send_with(out, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(response: &mut WebResponse) -> String {
        let mut out = Vec::new();
        response.send(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn defaults_to_200_without_body() {
        let mut response = WebResponse::default();
        assert_eq!(response.status(), Status::Ok);
        assert!(!response.is_fixed());
        assert_eq!(sent(&mut response), "HTTP/1.1 200 OK\r\n\r\n");
    }

    #[test]
    fn sends_headers_then_cookies_then_body() {
        let mut response = WebResponse::new(HttpVersion::HTTP_1_0);
        response.add_header("X-Foo", "bar");
        response.add_cookie(Cookie::create("sid", "1"));
        response.write("hello".into());
        assert_eq!(
            sent(&mut response),
            "HTTP/1.0 200 OK\r\nX-Foo: bar\r\nSet-Cookie: sid=1; HttpOnly\r\nContent-Length: 5\r\n\r\nhello",
        );
    }

    #[test]
    fn send_head_omits_body_but_keeps_length() {
        let mut response = WebResponse::default();
        response.write("hello".into());
        let mut out = Vec::new();
        response.send_head(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
    }

    #[test]
    fn same_named_header_and_cookie_replace_earlier_ones() {
        let mut response = WebResponse::default();
        response.add_header("X-Foo", "1");
        response.add_header("X-Foo", "2");
        response.add_cookie(Cookie::create("a", "1"));
        response.add_cookie(Cookie::create("a", "2"));
        assert!(response.contains_header("X-Foo", Some("2")));
        assert!(!response.contains_header("X-Foo", Some("1")));
        assert_eq!(response.cookies().len(), 1);
        assert!(response.contains_cookie("a", Some("2")));
    }

    #[test]
    fn remove_cookie_expires_it_in_the_past() {
        let mut response = WebResponse::default();
        response.remove_cookie("sid");
        let cookie = &response.cookies()[0];
        assert_eq!(cookie.value(), "remove");
        assert!(cookie.expiration() < Utc::now().timestamp());
    }

    #[test]
    fn redirect_does_not_fix() {
        let mut response = WebResponse::default();
        response.redirect("http://example.com/", Status::Found);
        assert_eq!(response.status(), Status::Found);
        assert!(response.contains_header("Location", Some("http://example.com/")));
        assert!(!response.is_fixed());
    }

    #[test]
    fn terminal_setters_fix_the_response() {
        let cases: [(fn(&mut WebResponse), Status); 4] = [
            (|r| r.forbidden(), Status::Forbidden),
            (|r| r.not_found(), Status::NotFound),
            (|r| r.internal_server_error("boom"), Status::InternalServerError),
            (|r| r.http_version_not_supported(), Status::HttpVersionNotSupported),
        ];
        for (apply, status) in cases {
            let mut response = WebResponse::default();
            apply(&mut response);
            assert_eq!(response.status(), status);
            assert!(response.is_fixed());
        }
    }

    #[test]
    fn method_not_allowed_lists_allowed_methods() {
        let mut response = WebResponse::default();
        response.method_not_allowed("POST", &["GET".into(), "HEAD".into()]);
        assert_eq!(response.status(), Status::MethodNotAllowed);
        assert!(response.contains_header("Allow", Some("GET, HEAD")));
        assert!(response.is_fixed());
    }

    #[test]
    fn not_acceptable_lists_supported_types() {
        let mut response = WebResponse::default();
        response.not_acceptable(&["application/json".into(), "application/xml".into()]);
        assert_eq!(response.status(), Status::NotAcceptable);
        assert!(response.contains_header("X-Acceptable", Some("application/json, application/xml")));
        assert!(response.is_fixed());
    }

    #[test]
    fn internal_server_error_uses_message_as_body() {
        let mut response = WebResponse::default();
        response.internal_server_error("ups");
        assert_eq!(response.body(), Some("ups"));
    }

    #[test]
    fn clear_resets_everything_but_version_and_is_idempotent() {
        let mut response = WebResponse::new(HttpVersion::HTTP_1_0);
        response.add_header("X-Foo", "bar");
        response.add_cookie(Cookie::create("a", "b"));
        response.write("body".into());
        response.not_found();

        response.clear();
        let once = format!("{response:?}");
        response.clear();
        assert_eq!(format!("{response:?}"), once);

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.version(), HttpVersion::HTTP_1_0);
        assert!(response.headers().is_empty());
        assert!(response.cookies().is_empty());
        assert_eq!(response.body(), None);
        assert!(!response.is_fixed());
    }

    #[test]
    fn data_bodies_render_as_json_without_formatter() {
        let mut response = WebResponse::default();
        response.write(serde_json::json!({"a": 1}).into());
        assert_eq!(response.body(), Some(r#"{"a":1}"#));
    }
}
