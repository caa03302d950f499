//! Sessions and session-scoped instances.
//!
//! A [`Session`] is a concurrent key/value store bound to one client via a
//! [`WebBoundSessionId`] cookie. [`MemorySessions`] keeps them in process
//! and attaches the right one to each request's extensions, where
//! [`CachingAuthorizationProvider`](crate::auth::CachingAuthorizationProvider)
//! and [`SessionScopedInjector`] pick it up. Sessions left unused for
//! longer than the registry's maximum idle time are dropped.

mod id;
mod scope;

pub use id::WebBoundSessionId;
pub use scope::{SessionScope, SessionScopedInjector};
pub(crate) use scope::request_injector;

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::request::Request;
use crate::response::Response;

/// One client's session.
pub struct Session {
    name: String,
    id: String,
    values: DashMap<String, Arc<dyn Any + Send + Sync>>,
    /// Unix time of the last request, in milliseconds.
    last_access: AtomicI64,
}

impl Session {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            values: DashMap::new(),
            last_access: AtomicI64::new(now_millis()),
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn id(&self) -> &str { &self.id }

    pub fn has_value(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn put_value<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.values.insert(key.to_owned(), Arc::new(value));
    }

    pub(crate) fn put_raw(&self, key: &str, value: Arc<dyn Any + Send + Sync>) {
        self.values.insert(key.to_owned(), value);
    }

    pub(crate) fn raw(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// The value under `key` if it is a `T`.
    pub fn value<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.raw(key)?.downcast::<T>().ok()
    }

    pub fn remove_value(&self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    fn touch(&self, now: i64) {
        self.last_access.store(now, Ordering::Relaxed);
    }

    fn is_idle(&self, now: i64, max_idle: Duration) -> bool {
        now - self.last_access.load(Ordering::Relaxed) >= max_idle.num_milliseconds()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Upper bound on how often idle sessions are looked for.
const SWEEP_INTERVAL_MILLIS: i64 = 60_000;

/// In-process session registry.
pub struct MemorySessions {
    name: String,
    sessions: DashMap<String, Arc<Session>>,
    max_idle: Duration,
    last_sweep: AtomicI64,
}

impl MemorySessions {
    /// Sessions identified by the cookie/parameter `name`, dropped after
    /// 30 minutes without a request.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sessions: DashMap::new(),
            max_idle: Duration::minutes(30),
            last_sweep: AtomicI64::new(now_millis()),
        }
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every idle session. Returns how many were dropped.
    pub fn purge_idle(&self) -> usize {
        let now = now_millis();
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_idle(now, self.max_idle);
            purged += usize::from(!keep);
            keep
        });
        if purged > 0 {
            debug!(purged, remaining = self.sessions.len(), "idle sessions dropped");
        }
        purged
    }

    fn sweep(&self, now: i64) {
        let last = self.last_sweep.load(Ordering::Relaxed);
        let interval = self.max_idle.num_milliseconds().min(SWEEP_INTERVAL_MILLIS);
        if now - last >= interval
            && self.last_sweep.compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed).is_ok()
        {
            self.purge_idle();
        }
    }

    /// Finds or starts the session for `request` and stores it in the
    /// request extensions. A new session sets its id cookie on `response`.
    pub fn attach(&self, request: &mut Request, response: &mut dyn Response) -> Arc<Session> {
        let now = now_millis();
        self.sweep(now);

        let mut id = WebBoundSessionId::new(request, &self.name);
        let existing = self
            .sessions
            .get(id.id())
            .map(|entry| Arc::clone(entry.value()))
            .filter(|session| !session.is_idle(now, self.max_idle));
        let session = match existing {
            Some(existing) => existing,
            None => {
                if !id.is_fresh() {
                    self.sessions.remove(id.id());
                    id.regenerate(response);
                } else {
                    id.bind(response);
                }
                debug!(session = %id.name(), "starting session");
                let session = Arc::new(Session::new(id.name(), id.id()));
                self.sessions.insert(id.id().to_owned(), Arc::clone(&session));
                session
            }
        };
        session.touch(now);
        request.extensions_mut().insert(Arc::clone(&session));
        session
    }

    /// Drops the session of `request` and tells the client to forget it.
    pub fn invalidate(&self, request: &Request, response: &mut dyn Response) {
        let mut id = WebBoundSessionId::new(request, &self.name);
        self.sessions.remove(id.id());
        id.invalidate(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::WebResponse;

    #[test]
    fn typed_values() {
        let session = Session::new("sid", "x");
        session.put_value("count", 3u32);
        assert!(session.has_value("count"));
        assert_eq!(session.value::<u32>("count").as_deref(), Some(&3));
        assert!(session.value::<String>("count").is_none());
        assert!(session.remove_value("count"));
        assert!(!session.has_value("count"));
    }

    #[test]
    fn attach_starts_and_finds_sessions() {
        let sessions = MemorySessions::new("sid");

        let mut request = Request::new("GET", "http://example.com/").unwrap();
        let mut response = WebResponse::default();
        let first = sessions.attach(&mut request, &mut response);
        assert!(response.contains_cookie("sid", Some(first.id())));
        assert!(request.extensions().get::<Arc<Session>>().is_some());
        first.put_value("k", "v".to_owned());

        let cookie = format!("sid={}", first.id());
        let mut request = Request::new("GET", "http://example.com/").unwrap().with_header("Cookie", &cookie);
        let mut response = WebResponse::default();
        let second = sessions.attach(&mut request, &mut response);
        assert_eq!(second.id(), first.id());
        assert_eq!(second.value::<String>("k").as_deref().map(String::as_str), Some("v"));
        assert!(response.cookies().is_empty());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn unknown_valid_id_is_replaced() {
        let sessions = MemorySessions::new("sid");
        let stale = "a".repeat(32);
        let mut request = Request::new("GET", "http://example.com/").unwrap()
            .with_header("Cookie", &format!("sid={stale}"));
        let mut response = WebResponse::default();
        let session = sessions.attach(&mut request, &mut response);
        assert_ne!(session.id(), stale);
    }

    #[test]
    fn anonymous_requests_do_not_pile_up() {
        let sessions = MemorySessions::new("sid").with_max_idle(Duration::zero());
        for _ in 0..1000 {
            let mut request = Request::new("GET", "http://example.com/").unwrap();
            sessions.attach(&mut request, &mut WebResponse::default());
        }
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn idle_session_is_replaced() {
        let sessions = MemorySessions::new("sid").with_max_idle(Duration::zero());
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        let first = sessions.attach(&mut request, &mut WebResponse::default());
        first.put_value("k", 1u8);

        let mut request = Request::new("GET", "http://example.com/").unwrap()
            .with_header("Cookie", &format!("sid={}", first.id()));
        let mut response = WebResponse::default();
        let second = sessions.attach(&mut request, &mut response);
        assert_ne!(second.id(), first.id());
        assert!(!second.has_value("k"));
        assert!(response.contains_cookie("sid", Some(second.id())));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn purge_keeps_recent_sessions() {
        let sessions = MemorySessions::new("sid");
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        sessions.attach(&mut request, &mut WebResponse::default());
        assert_eq!(sessions.purge_idle(), 0);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.max_idle(), Duration::minutes(30));
    }

    #[test]
    fn invalidate_removes_session_and_cookie() {
        let sessions = MemorySessions::new("sid");
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        let mut response = WebResponse::default();
        let session = sessions.attach(&mut request, &mut response);

        let request = Request::new("GET", "http://example.com/").unwrap()
            .with_header("Cookie", &format!("sid={}", session.id()));
        let mut response = WebResponse::default();
        sessions.invalidate(&request, &mut response);
        assert!(sessions.is_empty());
        assert!(response.contains_cookie("sid", Some("remove")));
    }
}
