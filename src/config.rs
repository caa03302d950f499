//! Application configuration.
//!
//! ```text
//! switchyard.toml
//!     → WebConfig::load     (toml + serde, all fields defaulted)
//!     → WebModule::from_config
//!           binds formatters, builds CORS + sessions
//!     → WebModule::app(|routing| { … routes … })
//!     → WebApp
//! ```
//!
//! Everything can also be done in code; the file only covers the settings
//! that differ between deployments.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use tracing::info;

use crate::app::WebApp;
use crate::error::Result;
use crate::interceptor::AddAccessControlAllowOriginHeader;
use crate::ioc::{Bindings, FORMATTER, Injector};
use crate::response::format::{Formatter, HtmlFormatter, JsonFormatter, PlainTextFormatter, XmlFormatter};
use crate::routing::Routing;
use crate::session::MemorySessions;

/// Deployment settings.
///
/// ```toml
/// listen = "0.0.0.0:8080"
/// session_name = "sid"
/// session_max_idle_secs = 1800
/// origin_hosts = '^https://[a-z]+\.example\.com$'
///
/// [html]
/// base_title = "Example"
/// template = "templates/page.html"
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address the server binds to.
    pub listen: String,

    /// Cookie and parameter name of the session id. Sessions are off when unset.
    pub session_name: Option<String>,

    /// Sessions unused for this long are dropped.
    pub session_max_idle_secs: u64,

    /// Regular expression of origins allowed to read responses cross-origin.
    pub origin_hosts: Option<String>,

    pub html: HtmlConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_owned(),
            session_name: None,
            session_max_idle_secs: 30 * 60,
            origin_hosts: None,
            html: HtmlConfig::default(),
        }
    }
}

/// Settings of the `text/html` formatter.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Appended to every page title.
    pub base_title: Option<String>,

    /// Path of a page template with `{TITLE}`, `{META}` and `{CONTENT}`.
    pub template: Option<PathBuf>,
}

impl WebConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        info!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }
}

/// Standard wiring of a web application.
///
/// Binds a formatter for `application/json`, `text/json`, `text/html`,
/// `text/plain` and the XML types, applies [`WebConfig`] and hands out the [`Routing`] to
/// declare routes on.
pub struct WebModule {
    config: WebConfig,
    bindings: Bindings,
    html: HtmlFormatter,
}

impl WebModule {
    /// Default wiring, no configuration file.
    pub fn new() -> Self {
        Self::with_html(WebConfig::default(), HtmlFormatter::new())
    }

    /// Wiring for `config`. Fails when the HTML template cannot be read.
    pub fn from_config(config: WebConfig) -> Result<Self> {
        let mut html = HtmlFormatter::new();
        if let Some(path) = &config.html.template {
            html = html.with_template(fs::read_to_string(path)?);
        }
        if let Some(base_title) = &config.html.base_title {
            html = html.with_base_title(base_title.as_str());
        }
        Ok(Self::with_html(config, html))
    }

    fn with_html(config: WebConfig, html: HtmlFormatter) -> Self {
        let mut bindings = Bindings::new();
        bindings
            .bind_formatter("application/json", JsonFormatter)
            .bind_formatter("text/json", JsonFormatter)
            .bind_formatter("text/plain", PlainTextFormatter)
            .bind_formatter("text/xml", XmlFormatter::new())
            .bind_formatter("application/xml", XmlFormatter::new())
            .bind_formatter("application/rss+xml", XmlFormatter::new());
        Self { config, bindings, html }
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Adds or replaces the formatter for `mime_type`.
    pub fn with_formatter<F: Formatter + 'static>(mut self, mime_type: &str, formatter: F) -> Self {
        self.bindings.bind_formatter(mime_type, formatter);
        self
    }

    /// For binding processors, interceptors and named formatters.
    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    /// The routing table over this module's bindings, with the CORS
    /// post-interceptor installed when origin hosts are configured.
    pub fn routing(mut self) -> Result<Routing> {
        // bound last so with_formatter can replace it
        if !self.bindings.has_binding(FORMATTER, Some("text/html")) {
            self.bindings.bind_formatter("text/html", self.html);
        }
        let mut routing = Routing::new(Arc::new(self.bindings));
        if let Some(origin_hosts) = &self.config.origin_hosts {
            let cors = AddAccessControlAllowOriginHeader::new().allow_origin_hosts(origin_hosts)?;
            routing.post_intercept(cors);
        }
        Ok(routing)
    }

    /// Builds the application: `configure` declares the routes, sessions are
    /// enabled when a session name is configured.
    pub fn app<F>(self, configure: F) -> Result<WebApp>
    where
        F: FnOnce(&mut Routing) -> Result<()>,
    {
        let max_idle = Duration::seconds(i64::from(
            u32::try_from(self.config.session_max_idle_secs).unwrap_or(u32::MAX),
        ));
        let sessions = self
            .config
            .session_name
            .clone()
            .map(|name| MemorySessions::new(name).with_max_idle(max_idle));
        let mut routing = self.routing()?;
        configure(&mut routing)?;
        let app = WebApp::new(routing);
        Ok(match sessions {
            Some(sessions) => app.with_sessions(sessions),
            None => app,
        })
    }
}

impl Default for WebModule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::request::Request;
    use crate::response::Response;
    use crate::uri::UriPath;

    #[test]
    fn missing_fields_use_defaults() {
        let config = WebConfig::from_toml_str("session_name = \"sid\"").unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000");
        assert_eq!(config.session_name.as_deref(), Some("sid"));
        assert!(config.origin_hosts.is_none());
        assert_eq!(config.session_max_idle_secs, 1800);
        assert!(config.html.template.is_none());
    }

    #[test]
    fn parses_html_section() {
        let config = WebConfig::from_toml_str(
            "listen = \"0.0.0.0:8080\"\n[html]\nbase_title = \"Example\"\n",
        )
        .unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.html.base_title.as_deref(), Some("Example"));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(WebConfig::from_toml_str("listen = "), Err(Error::Config(_))));
    }

    #[test]
    fn missing_template_file_is_an_io_error() {
        let config = WebConfig {
            html: HtmlConfig { base_title: None, template: Some("/nonexistent/switchyard.html".into()) },
            ..WebConfig::default()
        };
        assert!(matches!(WebModule::from_config(config), Err(Error::Io(_))));
    }

    #[test]
    fn default_formatters_are_bound() {
        let routing = WebModule::new().routing().unwrap();
        for mime in [
            "application/json",
            "text/json",
            "text/html",
            "text/plain",
            "text/xml",
            "application/xml",
            "application/rss+xml",
        ] {
            assert!(routing.injector().has_binding(FORMATTER, Some(mime)), "{mime}");
        }
    }

    #[test]
    fn invalid_origin_hosts_fail() {
        let config = WebConfig { origin_hosts: Some("(".into()), ..WebConfig::default() };
        let module = WebModule::from_config(config).unwrap();
        assert!(matches!(module.routing(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn app_applies_cors_and_sessions() {
        let config = WebConfig::from_toml_str(
            "session_name = \"sid\"\norigin_hosts = '^http://client\\.example\\.com$'\n",
        )
        .unwrap();
        let app = WebModule::from_config(config)
            .unwrap()
            .app(|routing| {
                routing.on_get("/ping", |_: &mut Request, res: &mut dyn Response, _: &UriPath| -> Result<()> {
                    res.write("pong".into());
                    Ok(())
                });
                Ok(())
            })
            .unwrap();

        let mut request = Request::new("GET", "http://example.com/ping").unwrap()
            .with_header("Origin", "http://client.example.com");
        let response = app.run(&mut request);
        assert_eq!(response.body(), Some("pong"));
        assert!(response.contains_header("Access-Control-Allow-Origin", Some("http://client.example.com")));
        assert!(response.contains_cookie("sid", None));
    }

    #[test]
    fn xml_is_negotiated_with_default_bindings() {
        let app = WebModule::new()
            .app(|routing| {
                routing
                    .on_get("/feed", |_: &mut Request, res: &mut dyn Response, _: &UriPath| -> Result<()> {
                        res.write(serde_json::json!({ "title": "news" }).into());
                        Ok(())
                    })
                    .supports_mime_type("application/json")
                    .supports_mime_type("application/rss+xml");
                Ok(())
            })
            .unwrap();

        let mut request = Request::new("GET", "http://example.com/feed").unwrap()
            .with_header("Accept", "application/rss+xml");
        let response = app.run(&mut request);
        assert_eq!(response.mime_type(), Some("application/rss+xml"));
        assert_eq!(
            response.body(),
            Some(r#"<?xml version="1.0" encoding="UTF-8"?><result><title>news</title></result>"#),
        );
    }
}
