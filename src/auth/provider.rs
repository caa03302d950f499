use std::sync::Arc;

use tracing::debug;

use crate::auth::{AuthHandler, AuthHandlerError, Roles, User};
use crate::request::Request;
use crate::session::Session;

/// Finds out who sent the request.
pub trait AuthenticationProvider: Send + Sync {
    /// `Ok(None)` when the request carries no valid login.
    fn authenticate(&self, request: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError>;

    fn login_uri(&self, request: &Request) -> String;
}

/// Finds out which roles a user has.
pub trait AuthorizationProvider: Send + Sync {
    fn roles(&self, request: &Request, user: &dyn User) -> Result<Roles, AuthHandlerError>;
}

/// [`AuthHandler`] composed of an authentication and an authorization provider.
pub struct ProviderAuthHandler {
    authentication: Arc<dyn AuthenticationProvider>,
    authorization: Arc<dyn AuthorizationProvider>,
}

impl ProviderAuthHandler {
    pub fn new(
        authentication: Arc<dyn AuthenticationProvider>,
        authorization: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self { authentication, authorization }
    }
}

impl ProviderAuthHandler {
    /// Authenticates `request` once; later calls for the same request read
    /// the outcome back from its extensions.
    fn user(&self, request: &mut Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
        if let Some(Authenticated(user)) = request.extensions().get::<Authenticated>() {
            return Ok(user.clone());
        }
        let user = self.authentication.authenticate(request)?;
        request.extensions_mut().insert(Authenticated(user.clone()));
        Ok(user)
    }
}

impl AuthHandler for ProviderAuthHandler {
    fn is_authenticated(&self, request: &mut Request) -> Result<bool, AuthHandlerError> {
        Ok(self.user(request)?.is_some())
    }

    fn is_authorized(&self, request: &mut Request, role: &str) -> Result<bool, AuthHandlerError> {
        let Some(user) = self.user(request)? else {
            return Ok(false);
        };
        Ok(self.authorization.roles(request, &*user)?.contain(role))
    }

    fn login_uri(&self, request: &Request) -> String {
        self.authentication.login_uri(request)
    }
}

/// Outcome of authenticating one request.
#[derive(Clone)]
struct Authenticated(Option<Arc<dyn User>>);

/// The user a [`ProviderAuthHandler`] authenticated for `request`, for
/// processors and interceptors behind a login-only route.
pub fn authenticated_user(request: &Request) -> Option<Arc<dyn User>> {
    request.extensions().get::<Authenticated>().and_then(|Authenticated(user)| user.clone())
}

/// Caches the roles of the original provider in the request's [`Session`]
/// under [`Roles::SESSION_KEY`]. Without a session every call goes through.
pub struct CachingAuthorizationProvider {
    original: Arc<dyn AuthorizationProvider>,
}

impl CachingAuthorizationProvider {
    pub fn new(original: Arc<dyn AuthorizationProvider>) -> Self {
        Self { original }
    }
}

impl AuthorizationProvider for CachingAuthorizationProvider {
    fn roles(&self, request: &Request, user: &dyn User) -> Result<Roles, AuthHandlerError> {
        let Some(session) = request.extensions().get::<Arc<Session>>() else {
            return self.original.roles(request, user);
        };

        if let Ok(roles) = Roles::from_session(session) {
            return Ok((*roles).clone());
        }

        debug!(user = user.name(), "loading roles");
        let roles = self.original.roles(request, user)?;
        session.put_value(Roles::SESSION_KEY, roles.clone());
        Ok(roles)
    }
}
