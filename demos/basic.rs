//! Minimal switchyard application: JSON and HTML routes, a role-protected
//! route behind bearer tokens, sessions and CORS.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i -H 'accept: text/html' http://localhost:3000/users/42
//!   curl -i -H 'accept: text/csv' http://localhost:3000/users/42    # 406
//!   curl -i -X DELETE http://localhost:3000/users/42                # 405
//!   curl -i -X OPTIONS http://localhost:3000/users/42
//!   curl -i http://localhost:3000/admin                             # 302 to /login
//!   curl -i -H 'x-user: bob' http://localhost:3000/admin            # 403
//!   curl -i -H 'x-user: alice' http://localhost:3000/admin           # X-Token: <token>
//!   curl -i -H 'authorization: Bearer <token>' http://localhost:3000/admin
//!   curl -i -H 'accept: application/xml' http://localhost:3000/users/42

use std::sync::Arc;

use serde_json::json;
use switchyard::auth::{
    AuthHandlerError, AuthenticationProvider, AuthorizationProvider, CachingAuthorizationProvider,
    MemoryTokenStore, ProviderAuthHandler, Roles, TokenAuthenticator, User, authenticated_user,
};
use switchyard::interceptor::PostRef;
use switchyard::{Request, Response, Server, UriPath, WebConfig, WebModule};

const CONFIG: &str = r#"
listen = "127.0.0.1:3000"
session_name = "sid"
session_max_idle_secs = 900
origin_hosts = '^http://localhost(:[0-9]+)?$'

[html]
base_title = "switchyard demo"
"#;

#[tokio::main]
async fn main() -> switchyard::Result<()> {
    tracing_subscriber::fmt::init();

    let config = WebConfig::from_toml_str(CONFIG)?;
    let server = Server::from_config(&config);

    let login: Arc<dyn AuthenticationProvider> = Arc::new(HeaderLogin);
    let tokens = TokenAuthenticator::new(Arc::new(MemoryTokenStore::new()), login, "demo-salt");
    let roles = CachingAuthorizationProvider::new(Arc::new(StaticRoles));
    let auth = Arc::new(ProviderAuthHandler::new(Arc::new(tokens), Arc::new(roles)));

    let app = WebModule::from_config(config)?.app(|routing| {
        routing
            .supports_mime_type("application/json")
            .supports_mime_type("text/html")
            .supports_mime_type("application/xml")
            .set_auth_handler(auth)
            .post_intercept(PostRef::function(|_, res| res.add_header("X-Powered-By", "switchyard")));

        routing.on_get("/users/{id}", get_user);
        routing.on_put("/users/{id}", update_user).with_login_only();
        routing.on_get("/admin", admin).with_role_only("admin");
        routing
            .on_get("/static/{file:.+}", static_file)
            .disable_content_negotiation();
        Ok(())
    })?;

    server.serve(app).await
}

// GET /users/{id}
fn get_user(_: &mut Request, res: &mut dyn Response, path: &UriPath) -> switchyard::Result<()> {
    let id = path.argument_or("id", "unknown");
    res.write(json!({ "id": id, "name": "alice" }).into());
    Ok(())
}

// PUT /users/{id}
fn update_user(req: &mut Request, res: &mut dyn Response, path: &UriPath) -> switchyard::Result<()> {
    let body: serde_json::Value = serde_json::from_slice(req.body())
        .map_err(|e| switchyard::Error::msg(format!("invalid user document: {e}")))?;
    res.write(json!({ "id": path.argument("id"), "updated": body }).into());
    Ok(())
}

// GET /admin
fn admin(req: &mut Request, res: &mut dyn Response, _: &UriPath) -> switchyard::Result<()> {
    let user = authenticated_user(req);
    if let Some(token) = user.as_ref().and_then(|u| u.token()) {
        res.add_header("X-Token", &token.to_string());
    }
    res.write(json!({ "admin": true, "user": user.as_ref().map(|u| u.name()) }).into());
    Ok(())
}

// GET /static/{file}
fn static_file(_: &mut Request, res: &mut dyn Response, path: &UriPath) -> switchyard::Result<()> {
    res.add_header("Content-Type", "text/plain");
    res.write(format!("contents of {}", path.argument_or("file", "")).into());
    Ok(())
}

// ── Auth ──────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct DemoUser(String);

impl User for DemoUser {
    fn name(&self) -> &str {
        &self.0
    }
}

/// Trusts an `X-User` header. Demo only.
struct HeaderLogin;

impl AuthenticationProvider for HeaderLogin {
    fn authenticate(&self, request: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
        Ok(request
            .header("x-user")
            .map(|name| Arc::new(DemoUser(name.to_owned())) as Arc<dyn User>))
    }

    fn login_uri(&self, _: &Request) -> String {
        "/login".to_owned()
    }
}

struct StaticRoles;

impl AuthorizationProvider for StaticRoles {
    fn roles(&self, _: &Request, user: &dyn User) -> Result<Roles, AuthHandlerError> {
        Ok(match user.name() {
            "alice" => Roles::new(["admin"]),
            _ => Roles::none(),
        })
    }
}
