use std::sync::Arc;

use crate::error::Result;
use crate::ioc::{Injector, Instance};
use crate::request::Request;
use crate::session::Session;

/// Keeps one instance per session.
///
/// The first lookup in a session creates the instance through the provider
/// and stores it in the session; later lookups return that same instance.
pub struct SessionScope;

impl SessionScope {
    fn key(type_name: &str, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("switchyard::scope::{type_name}#{name}"),
            None => format!("switchyard::scope::{type_name}"),
        }
    }

    pub fn instance<F>(session: &Session, type_name: &str, name: Option<&str>, provider: F) -> Result<Instance>
    where
        F: FnOnce() -> Result<Instance>,
    {
        let key = Self::key(type_name, name);
        if let Some(instance) = session.raw(&key) {
            return Ok(instance);
        }
        let instance = provider()?;
        session.put_raw(&key, Arc::clone(&instance));
        Ok(instance)
    }
}

/// Wraps an injector so the types it marks as session scoped are resolved
/// once per session.
pub struct SessionScopedInjector {
    inner: Arc<dyn Injector>,
    session: Arc<Session>,
}

impl SessionScopedInjector {
    pub fn new(inner: Arc<dyn Injector>, session: Arc<Session>) -> Self {
        Self { inner, session }
    }
}

impl Injector for SessionScopedInjector {
    fn has_binding(&self, type_name: &str, name: Option<&str>) -> bool {
        self.inner.has_binding(type_name, name)
    }

    fn instance(&self, type_name: &str, name: Option<&str>) -> Result<Instance> {
        if !self.inner.is_session_scoped(type_name) {
            return self.inner.instance(type_name, name);
        }
        SessionScope::instance(&self.session, type_name, name, || self.inner.instance(type_name, name))
    }

    fn is_session_scoped(&self, type_name: &str) -> bool {
        self.inner.is_session_scoped(type_name)
    }
}

/// The injector to resolve through while handling `request`: scoped to its
/// session when one is attached.
pub(crate) fn request_injector(injector: &Arc<dyn Injector>, request: &Request) -> Arc<dyn Injector> {
    match request.extensions().get::<Arc<Session>>() {
        Some(session) => Arc::new(SessionScopedInjector::new(Arc::clone(injector), Arc::clone(session))),
        None => Arc::clone(injector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out a new counter value on every lookup.
    #[derive(Default)]
    struct Fresh(AtomicUsize);

    impl Injector for Fresh {
        fn has_binding(&self, type_name: &str, _: Option<&str>) -> bool {
            type_name == "Cart"
        }

        fn is_session_scoped(&self, type_name: &str) -> bool {
            type_name == "Cart"
        }

        fn instance(&self, type_name: &str, _: Option<&str>) -> Result<Instance> {
            if type_name != "Cart" && type_name != "Clock" {
                return Err(Error::Binding { type_name: type_name.into(), name: None });
            }
            Ok(Arc::new(self.0.fetch_add(1, Ordering::SeqCst)))
        }
    }

    fn number(instance: Instance) -> usize {
        *instance.downcast::<usize>().unwrap()
    }

    #[test]
    fn scope_reuses_instance_within_session() {
        let session = Session::new("sid", "1");
        let calls = AtomicUsize::new(0);
        let provider = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(7usize) as Instance)
        };
        let a = SessionScope::instance(&session, "Cart", None, provider).unwrap();
        let b = SessionScope::instance(&session, "Cart", None, provider).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_marked_types_are_session_scoped() {
        let inner: Arc<dyn Injector> = Arc::new(Fresh::default());
        let session = Arc::new(Session::new("sid", "1"));
        let injector = SessionScopedInjector::new(Arc::clone(&inner), Arc::clone(&session));

        assert_eq!(number(injector.instance("Cart", None).unwrap()), 0);
        assert_eq!(number(injector.instance("Cart", None).unwrap()), 0);
        assert_eq!(number(injector.instance("Clock", None).unwrap()), 1);
        assert_eq!(number(injector.instance("Clock", None).unwrap()), 2);
        assert!(injector.has_binding("Cart", None));
        assert!(injector.instance("Nope", None).is_err());

        let other = SessionScopedInjector::new(inner, Arc::new(Session::new("sid", "2")));
        assert_eq!(number(other.instance("Cart", None).unwrap()), 3);
    }

    #[test]
    fn request_injector_follows_the_attached_session() {
        let inner: Arc<dyn Injector> = Arc::new(Fresh::default());
        let mut request = Request::new("GET", "http://example.com/").unwrap();
        assert_eq!(number(request_injector(&inner, &request).instance("Cart", None).unwrap()), 0);
        assert_eq!(number(request_injector(&inner, &request).instance("Cart", None).unwrap()), 1);

        request.extensions_mut().insert(Arc::new(Session::new("sid", "1")));
        assert_eq!(number(request_injector(&inner, &request).instance("Cart", None).unwrap()), 2);
        assert_eq!(number(request_injector(&inner, &request).instance("Cart", None).unwrap()), 2);
    }
}
