use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::{AuthHandlerError, AuthenticationProvider, User};
use crate::error::Result;
use crate::request::Request;

/// An opaque login token.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Token(Option<String>);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Some(value.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// A fresh random token for `user`.
    pub fn create(user: &dyn User, salt: &str) -> Self {
        let nonce: u64 = rand::random();
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(user.name().as_bytes());
        hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        Self::new(hex::encode(hasher.finalize()))
    }

    /// No value, or an empty one.
    pub fn is_empty(&self) -> bool {
        self.0.as_deref().is_none_or(str::is_empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or_default())
    }
}

/// Remembers which user a token was issued to.
pub trait TokenStore: Send + Sync {
    fn store(&self, request: &Request, token: &Token, user: Arc<dyn User>) -> Result<()>;

    fn find_user_by_token(&self, request: &Request, token: &Token) -> Result<Option<Arc<dyn User>>>;

    /// Forgets `token`, e.g. on logout. `Ok(false)` when it was unknown.
    fn remove(&self, request: &Request, token: &Token) -> Result<bool>;
}

/// Process-local [`TokenStore`]. Tokens expire a fixed time after they
/// were issued, one day unless configured otherwise.
pub struct MemoryTokenStore {
    users: DashMap<String, (Arc<dyn User>, DateTime<Utc>)>,
    max_age: Duration,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self { users: DashMap::new(), max_age: Duration::days(1) }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Drops every expired token. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.users.len();
        self.users.retain(|_, (_, issued)| !self.is_expired(*issued, now));
        before.saturating_sub(self.users.len())
    }

    fn is_expired(&self, issued: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - issued >= self.max_age
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MemoryTokenStore {
    fn store(&self, _request: &Request, token: &Token, user: Arc<dyn User>) -> Result<()> {
        self.purge_expired();
        self.users.insert(token.to_string(), (user, Utc::now()));
        Ok(())
    }

    fn find_user_by_token(&self, _request: &Request, token: &Token) -> Result<Option<Arc<dyn User>>> {
        let key = token.to_string();
        let found = self.users.get(&key).map(|entry| (Arc::clone(&entry.0), entry.1));
        match found {
            Some((user, issued)) if !self.is_expired(issued, Utc::now()) => Ok(Some(user)),
            Some(_) => {
                debug!("token expired");
                self.users.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn remove(&self, _request: &Request, token: &Token) -> Result<bool> {
        Ok(self.users.remove(&token.to_string()).is_some())
    }
}

/// A user together with the token issued at login.
#[derive(Debug)]
pub struct TokenUser {
    user: Arc<dyn User>,
    token: Token,
}

impl TokenUser {
    pub fn new(user: Arc<dyn User>, token: Token) -> Self {
        Self { user, token }
    }

    pub fn inner(&self) -> &Arc<dyn User> {
        &self.user
    }
}

impl User for TokenUser {
    fn name(&self) -> &str { self.user.name() }
    fn first_name(&self) -> Option<&str> { self.user.first_name() }
    fn last_name(&self) -> Option<&str> { self.user.last_name() }
    fn mail_address(&self) -> Option<&str> { self.user.mail_address() }
    fn token(&self) -> Option<&Token> { Some(&self.token) }
}

/// Authenticates by `Authorization: Bearer <token>`.
///
/// Requests without a known token fall back to the login provider. A
/// successful login is issued a new token: the returned user is a
/// [`TokenUser`] whose [`token`](User::token) the application hands to the
/// client, and it is stored so later requests can present it.
pub struct TokenAuthenticator {
    store: Arc<dyn TokenStore>,
    login: Arc<dyn AuthenticationProvider>,
    salt: String,
}

impl TokenAuthenticator {
    pub fn new(store: Arc<dyn TokenStore>, login: Arc<dyn AuthenticationProvider>, salt: impl Into<String>) -> Self {
        Self { store, login, salt: salt.into() }
    }

    fn bearer(request: &Request) -> Token {
        request
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| Token::new(t.trim()))
            .unwrap_or_default()
    }
}

impl AuthenticationProvider for TokenAuthenticator {
    fn authenticate(&self, request: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
        let token = Self::bearer(request);
        if !token.is_empty() {
            let found = self.store
                .find_user_by_token(request, &token)
                .map_err(|e| AuthHandlerError::internal(e.to_string()))?;
            if found.is_some() {
                return Ok(found);
            }
            debug!("unknown bearer token");
        }

        let Some(user) = self.login.authenticate(request)? else {
            return Ok(None);
        };
        let token = Token::create(&*user, &self.salt);
        debug!(user = user.name(), "issuing token");
        let user: Arc<dyn User> = Arc::new(TokenUser::new(user, token.clone()));
        self.store
            .store(request, &token, Arc::clone(&user))
            .map_err(|e| AuthHandlerError::internal(e.to_string()))?;
        Ok(Some(user))
    }

    fn login_uri(&self, request: &Request) -> String {
        self.login.login_uri(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Bob;

    impl User for Bob {
        fn name(&self) -> &str { "bob" }
    }

    struct NeverLoggedIn;

    impl AuthenticationProvider for NeverLoggedIn {
        fn authenticate(&self, _: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
            Ok(None)
        }

        fn login_uri(&self, _: &Request) -> String { "/login".into() }
    }

    struct AlwaysBob;

    impl AuthenticationProvider for AlwaysBob {
        fn authenticate(&self, _: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
            Ok(Some(Arc::new(Bob)))
        }

        fn login_uri(&self, _: &Request) -> String { "/login".into() }
    }

    fn request(bearer: Option<&str>) -> Request {
        let request = Request::new("GET", "http://example.com/").unwrap();
        match bearer {
            Some(token) => request.with_header("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    #[test]
    fn token_emptiness() {
        assert!(Token::none().is_empty());
        assert!(Token::new("").is_empty());
        assert!(!Token::new("abc").is_empty());
        assert_eq!(Token::new("abc").to_string(), "abc");
        assert_eq!(Token::none().to_string(), "");
    }

    #[test]
    fn created_tokens_are_hex_and_unique() {
        let a = Token::create(&Bob, "salt");
        let b = Token::create(&Bob, "salt");
        assert_eq!(a.as_str().unwrap().len(), 64);
        assert!(a.as_str().unwrap().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn known_bearer_token_authenticates() {
        let store = Arc::new(MemoryTokenStore::new());
        store.store(&request(None), &Token::new("t0k3n"), Arc::new(Bob)).unwrap();
        let auth = TokenAuthenticator::new(store, Arc::new(NeverLoggedIn), "salt");

        let user = auth.authenticate(&request(Some("t0k3n"))).unwrap().unwrap();
        assert_eq!(user.name(), "bob");
        assert!(auth.authenticate(&request(Some("other"))).unwrap().is_none());
        assert!(auth.authenticate(&request(None)).unwrap().is_none());
    }

    #[test]
    fn login_issues_and_stores_a_token() {
        let store = Arc::new(MemoryTokenStore::new());
        let auth = TokenAuthenticator::new(
            Arc::clone(&store) as Arc<dyn TokenStore>,
            Arc::new(AlwaysBob),
            "salt",
        );
        let user = auth.authenticate(&request(None)).unwrap().unwrap();
        assert_eq!(user.name(), "bob");
        assert!(!user.token().unwrap().is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(auth.login_uri(&request(None)), "/login");
    }

    /// Logs in only requests carrying `X-Password: secret`.
    struct PasswordLogin;

    impl AuthenticationProvider for PasswordLogin {
        fn authenticate(&self, request: &Request) -> Result<Option<Arc<dyn User>>, AuthHandlerError> {
            Ok((request.header("x-password") == Some("secret")).then(|| Arc::new(Bob) as Arc<dyn User>))
        }

        fn login_uri(&self, _: &Request) -> String { "/login".into() }
    }

    #[test]
    fn issued_token_authenticates_later_requests() {
        let store = Arc::new(MemoryTokenStore::new());
        let auth = TokenAuthenticator::new(Arc::clone(&store) as Arc<dyn TokenStore>, Arc::new(PasswordLogin), "salt");

        let login = request(None).with_header("X-Password", "secret");
        let token = auth.authenticate(&login).unwrap().unwrap().token().unwrap().to_string();

        let user = auth.authenticate(&request(Some(token.as_str()))).unwrap().unwrap();
        assert_eq!(user.name(), "bob");
        assert_eq!(user.token().map(Token::to_string), Some(token));
        assert_eq!(store.len(), 1);
        assert!(auth.authenticate(&request(None)).unwrap().is_none());
    }

    #[test]
    fn removed_token_no_longer_authenticates() {
        let store = MemoryTokenStore::new();
        store.store(&request(None), &Token::new("t0k3n"), Arc::new(Bob)).unwrap();
        assert!(store.remove(&request(None), &Token::new("t0k3n")).unwrap());
        assert!(!store.remove(&request(None), &Token::new("t0k3n")).unwrap());
        assert!(store.find_user_by_token(&request(None), &Token::new("t0k3n")).unwrap().is_none());
    }

    #[test]
    fn expired_tokens_are_dropped() {
        let store = MemoryTokenStore::new().with_max_age(Duration::zero());
        for token in ["a", "b", "c"] {
            store.store(&request(None), &Token::new(token), Arc::new(Bob)).unwrap();
        }
        assert_eq!(store.len(), 1, "storing purges expired tokens");
        assert!(store.find_user_by_token(&request(None), &Token::new("c")).unwrap().is_none());
        assert!(store.is_empty());

        let store = MemoryTokenStore::new();
        store.store(&request(None), &Token::new("fresh"), Arc::new(Bob)).unwrap();
        assert_eq!(store.purge_expired(), 0);
        assert!(store.find_user_by_token(&request(None), &Token::new("fresh")).unwrap().is_some());
    }
}
