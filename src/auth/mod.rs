//! Authentication and authorization.
//!
//! Routes that require a login or a role are wrapped in an
//! [`AuthorizingRoute`] which asks the application's [`AuthHandler`] before
//! anything else runs. The handler is usually a [`ProviderAuthHandler`]
//! built from an [`AuthenticationProvider`] (who is this?) and an
//! [`AuthorizationProvider`] (what may they do?).

mod authorizing;
mod provider;
mod token;

pub use authorizing::AuthorizingRoute;
pub use provider::{
    AuthenticationProvider, AuthorizationProvider, CachingAuthorizationProvider, ProviderAuthHandler,
    authenticated_user,
};
pub use token::{MemoryTokenStore, Token, TokenAuthenticator, TokenStore, TokenUser};

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error as ThisError;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::session::Session;

// ── AuthHandler ───────────────────────────────────────────────────────────────

/// Decides whether the current request is authenticated and authorized.
///
/// Both checks run for the same request, authentication first. Handlers
/// may keep what they learned in the request extensions.
pub trait AuthHandler: Send + Sync {
    fn is_authenticated(&self, request: &mut Request) -> Result<bool, AuthHandlerError>;

    fn is_authorized(&self, request: &mut Request, role: &str) -> Result<bool, AuthHandlerError>;

    /// Where unauthenticated requests are redirected to.
    fn login_uri(&self, request: &Request) -> String;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthErrorKind {
    /// Broken on our side: answered with `500`.
    Internal,
    /// A backing service is unavailable: answered with `503`.
    External,
}

/// Failure while checking authentication or authorization.
#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct AuthHandlerError {
    kind: AuthErrorKind,
    message: String,
}

impl AuthHandlerError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self { kind: AuthErrorKind::Internal, message: message.into() }
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self { kind: AuthErrorKind::External, message: message.into() }
    }

    pub fn kind(&self) -> AuthErrorKind { self.kind }
    pub fn is_internal(&self) -> bool { self.kind == AuthErrorKind::Internal }
    pub fn message(&self) -> &str { &self.message }
}

// ── User & Roles ──────────────────────────────────────────────────────────────

/// An authenticated principal.
pub trait User: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn first_name(&self) -> Option<&str> { None }
    fn last_name(&self) -> Option<&str> { None }
    fn mail_address(&self) -> Option<&str> { None }

    /// Token issued at login, see [`TokenAuthenticator`].
    fn token(&self) -> Option<&Token> { None }
}

/// The roles granted to a user.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Roles(BTreeSet<String>);

impl Roles {
    /// Session key the roles of the logged in user are cached under.
    pub const SESSION_KEY: &'static str = "switchyard::auth::Roles";

    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn contain(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Roles cached in `session` by an earlier authorization.
    pub fn from_session(session: &Session) -> Result<Arc<Roles>> {
        session
            .value::<Roles>(Self::SESSION_KEY)
            .ok_or_else(|| Error::msg("No roles available - are you sure a login happened?"))
    }
}
