use regex::Regex;

use crate::error::{Error, Result};
use crate::interceptor::PostInterceptor;
use crate::request::Request;
use crate::response::Response;

/// Echoes an allowed `Origin` back as `Access-Control-Allow-Origin`.
///
/// Allowed origins are a regular expression, typically from
/// [`WebConfig::origin_hosts`](crate::WebConfig). Without one the
/// interceptor does nothing.
#[derive(Clone, Debug, Default)]
pub struct AddAccessControlAllowOriginHeader {
    allowed: Option<Regex>,
}

impl AddAccessControlAllowOriginHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_origin_hosts(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::invalid(format!("invalid origin hosts pattern `{pattern}`: {e}")))?;
        self.allowed = Some(regex);
        Ok(self)
    }
}

impl PostInterceptor for AddAccessControlAllowOriginHeader {
    fn post_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        let (Some(allowed), Some(origin)) = (&self.allowed, request.header("origin")) else {
            return Ok(true);
        };

        if allowed.is_match(origin) {
            response.add_header("Access-Control-Allow-Origin", origin);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::WebResponse;

    const HOSTS: &str = r"^http://[a-zA-Z0-9.-]+example\.net(:[0-9]{4})?$|^http://[a-zA-Z0-9.-]+example\.com(:[0-9]{4})?$";

    fn run(interceptor: &AddAccessControlAllowOriginHeader, origin: Option<&str>) -> WebResponse {
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        if let Some(origin) = origin {
            request = request.with_header("Origin", origin);
        }
        let mut response = WebResponse::default();
        assert!(interceptor.post_process(&mut request, &mut response).unwrap());
        response
    }

    #[test]
    fn unconfigured_adds_nothing() {
        let response = run(&AddAccessControlAllowOriginHeader::new(), Some("http://foo.example.com"));
        assert!(response.headers().is_empty());
    }

    #[test]
    fn missing_origin_adds_nothing() {
        let interceptor = AddAccessControlAllowOriginHeader::new().allow_origin_hosts(HOSTS).unwrap();
        assert!(run(&interceptor, None).headers().is_empty());
    }

    #[test]
    fn foreign_origin_adds_nothing() {
        let interceptor = AddAccessControlAllowOriginHeader::new().allow_origin_hosts(HOSTS).unwrap();
        assert!(run(&interceptor, Some("http://example.org")).headers().is_empty());
    }

    #[test]
    fn allowed_origin_is_echoed() {
        let interceptor = AddAccessControlAllowOriginHeader::new().allow_origin_hosts(HOSTS).unwrap();
        let response = run(&interceptor, Some("http://foo.example.com:9039"));
        assert!(response.contains_header("Access-Control-Allow-Origin", Some("http://foo.example.com:9039")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(AddAccessControlAllowOriginHeader::new().allow_origin_hosts("(").is_err());
    }
}
