//! HTTP server and graceful shutdown.
//!
//! The pipeline in [`WebApp`] is synchronous. The server owns the async
//! side: it accepts connections, collects each request body, runs the
//! pipeline on tokio's blocking pool and turns the finished response into a
//! hyper response.
//!
//! Connections speak HTTP/1.x only: responses are assembled with an
//! HTTP/1 status line, so HTTP/2 is never negotiated.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection finish and then returns from [`Server::serve`].
//!
//! # Behind a proxy
//!
//! TLS is expected to end at the reverse proxy. Requests are seen as `http`
//! unless the proxy sends `X-Forwarded-Proto: https`, which is what
//! HTTPS-only routes look at.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HOST;
use http::request::Parts;
use http::{StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::app::WebApp;
use crate::config::WebConfig;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::{Output, Response, WebResponse};
use crate::status::Status;
use crate::version::HttpVersion;

/// The HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use switchyard::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn from_config(config: &WebConfig) -> Self {
        Self::bind(config.listen.as_str())
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Fails when the address is invalid or cannot be bound. Otherwise
    /// returns only after a full graceful shutdown.
    pub async fn serve(self, app: WebApp) -> Result<()> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .map_err(|e| Error::invalid(format!("invalid listen address `{}`: {e}", self.addr)))?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, routes = app.routing().routes().len(), "switchyard listening");

        run(listener, Arc::new(app), shutdown_signal()).await;
        info!("switchyard stopped");
        Ok(())
    }
}

/// Accepts connections on `listener` until `shutdown` resolves, then waits
/// for the in-flight connections.
async fn run(listener: TcpListener, app: Arc<WebApp>, shutdown: impl Future<Output = ()>) {
    let mut tasks = tokio::task::JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // shutdown first: no new connections once the signal is in
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let app = Arc::clone(&app);
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // called once per request on the connection
                    let svc = service_fn(move |req| {
                        let app = Arc::clone(&app);
                        async move { dispatch(app, req, remote_addr).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // reap finished connections
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the pipeline. All failures end up as HTTP
/// responses, so hyper never sees an error.
async fn dispatch(
    app: Arc<WebApp>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(plain(Status::BadRequest, HttpVersion::from(parts.version)));
        }
    };

    let mut request = to_request(&parts, body);
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let handled = tokio::task::spawn_blocking(move || {
        let mut out = HyperOutput::default();
        app.respond(&mut request, &mut out).map(|()| out)
    })
    .await;

    let response = match handled {
        Ok(Ok(out)) => out.into_response(),
        Ok(Err(e)) => {
            error!(%method, %path, "failed to write response: {e}");
            plain(Status::InternalServerError, HttpVersion::from(parts.version))
        }
        Err(e) => {
            error!(%method, %path, "request task failed: {e}");
            plain(Status::InternalServerError, HttpVersion::from(parts.version))
        }
    };
    debug!(peer = %remote_addr, %method, %path, status = response.status().as_u16(), "request handled");
    Ok(response)
}

fn to_request(parts: &Parts, body: Bytes) -> Request {
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect();

    Request::from_parts(
        parts.method.as_str().to_owned(),
        absolute_uri(parts),
        HttpVersion::from(parts.version),
        headers,
        body.to_vec(),
    )
}

/// Route matching and HTTPS redirects need scheme and host, which
/// HTTP/1.1 only sends in the `Host` header.
fn absolute_uri(parts: &Parts) -> Uri {
    if parts.uri.authority().is_some() {
        return parts.uri.clone();
    }
    let Some(host) = parts.headers.get(HOST).and_then(|h| h.to_str().ok()) else {
        return parts.uri.clone();
    };
    let scheme = match parts.headers.get("x-forwarded-proto").and_then(|h| h.to_str().ok()) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    let path = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{scheme}://{host}{path}").parse().unwrap_or_else(|_| parts.uri.clone())
}

fn plain(status: Status, version: HttpVersion) -> http::Response<Full<Bytes>> {
    let mut response = WebResponse::new(version);
    response.set_status(status);
    let mut out = HyperOutput::default();
    match response.send(&mut out) {
        Ok(()) => out.into_response(),
        Err(_) => fallback(),
    }
}

fn fallback() -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Collects a [`Response`] into a hyper response.
#[derive(Default)]
struct HyperOutput {
    builder: http::response::Builder,
    body: Bytes,
}

impl Output for HyperOutput {
    fn status_line(&mut self, version: HttpVersion, status: Status) -> Result<()> {
        let version = if version == HttpVersion::HTTP_1_0 { http::Version::HTTP_10 } else { http::Version::HTTP_11 };
        let builder = std::mem::take(&mut self.builder);
        self.builder = builder.version(version).status(status.code());
        Ok(())
    }

    fn header(&mut self, name: &str, value: &str) -> Result<()> {
        let builder = std::mem::take(&mut self.builder);
        self.builder = builder.header(name, value);
        Ok(())
    }

    fn finish(&mut self, body: Option<&[u8]>) -> Result<()> {
        self.body = body.map(Bytes::copy_from_slice).unwrap_or_default();
        Ok(())
    }
}

impl HyperOutput {
    fn into_response(self) -> http::Response<Full<Bytes>> {
        match self.builder.body(Full::new(self.body)) {
            Ok(response) => response,
            Err(e) => {
                error!("invalid response: {e}");
                fallback()
            }
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
