//! # switchyard
//!
//! Request dispatch for web applications: routing, interceptors, content
//! negotiation and authorization, on top of a small hyper server.
//!
//! ## How a request moves
//!
//! ```text
//! hyper request
//!   → Request                       (server adapter)
//!   → Routing::find_route           matching / authorizing / 404 / 405 / OPTIONS / 500
//!   → ResponseNegotiator            protocol version, MIME type → Formatter
//!   → pre-interceptors → processor → post-interceptors
//!   → Response::send → hyper response
//! ```
//!
//! Every step can end the request early by fixing the response (`404`,
//! `406`, `500` …). Whatever happens, the client gets a well-formed
//! response.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::{Request, Response, Server, UriPath, WebModule};
//!
//! #[tokio::main]
//! async fn main() -> switchyard::Result<()> {
//!     let app = WebModule::new().app(|routing| {
//!         routing.on_get("/users/{id}", get_user).supports_mime_type("application/json");
//!         routing.on_post("/admin/users", create_user).with_role_only("admin");
//!         Ok(())
//!     })?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! fn get_user(_: &mut Request, res: &mut dyn Response, path: &UriPath) -> switchyard::Result<()> {
//!     let id = path.argument_or("id", "unknown");
//!     res.write(serde_json::json!({ "id": id }).into());
//!     Ok(())
//! }
//!
//! fn create_user(req: &mut Request, res: &mut dyn Response, _: &UriPath) -> switchyard::Result<()> {
//!     if req.body().is_empty() {
//!         res.set_status(switchyard::Status::BadRequest);
//!         return Ok(());
//!     }
//!     res.set_status(switchyard::Status::Created);
//!     res.add_header("Location", "/users/99");
//!     Ok(())
//! }
//! ```

mod app;
mod config;
mod error;
mod handler;
mod method;
mod request;
mod route;
mod server;
mod status;
mod uri;
mod version;

pub mod auth;
pub mod interceptor;
pub mod ioc;
pub mod response;
pub mod routing;
pub mod session;

pub use app::WebApp;
pub use config::{HtmlConfig, WebConfig, WebModule};
pub use error::{Error, Result};
pub use handler::{Handler, ProcessFn, Processor, Requirements};
pub use interceptor::{Interceptor, PostInterceptor, PreInterceptor};
pub use ioc::{Bindings, Injector};
pub use method::Method;
pub use request::Request;
pub use response::{Body, Cookie, Headers, Output, Response, WebResponse, format};
pub use route::Route;
pub use routing::{ProcessableRoute, Routing, SelectedRoute};
pub use server::Server;
pub use session::{MemorySessions, Session};
pub use status::Status;
pub use uri::{PathPattern, UriPath, UriRequest};
pub use version::HttpVersion;
