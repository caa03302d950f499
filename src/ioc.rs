//! Dependency lookup.
//!
//! The pipeline resolves three kinds of things lazily, by name: formatters
//! for a negotiated MIME type, processors and interceptors declared by type
//! name, and formatter overrides on routes. [`Injector`] is the narrow
//! contract for that lookup; [`Bindings`] is the in-memory implementation
//! applications normally use.
//!
//! A binding is either one shared instance or a provider called on every
//! lookup. Types marked with [`Bindings::in_session_scope`] are resolved
//! once per session while a request carries one.
//!
//! Instances are stored type-erased. Trait objects are bound wrapped in an
//! `Arc`, so a formatter bound as `Arc<dyn Formatter>` is read back with
//! [`resolve::<dyn Formatter>`](resolve).

use std::any::{Any, type_name};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::handler::Processor;
use crate::interceptor::{PostInterceptor, PreInterceptor};
use crate::response::format::Formatter;

/// A type-erased bound instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type identifier formatters are bound under, named by MIME type.
pub const FORMATTER: &str = "switchyard::Formatter";

/// Resolves instances by type identifier and optional name.
pub trait Injector: Send + Sync {
    fn has_binding(&self, type_name: &str, name: Option<&str>) -> bool;

    /// Fails with [`Error::Binding`] when nothing is bound.
    fn instance(&self, type_name: &str, name: Option<&str>) -> Result<Instance>;

    /// Lookups of `type_name` are kept per session.
    fn is_session_scoped(&self, _type_name: &str) -> bool {
        false
    }
}

/// Resolves `type_name` and downcasts it to `Arc<T>`.
///
/// `Ok(None)` means something is bound but it is not a `T`.
pub fn resolve<T>(injector: &dyn Injector, type_name: &str, name: Option<&str>) -> Result<Option<Arc<T>>>
where
    T: ?Sized + Send + Sync + 'static,
{
    let instance = injector.instance(type_name, name)?;
    Ok(instance.downcast_ref::<Arc<T>>().cloned())
}

// ── Bindings ──────────────────────────────────────────────────────────────────

/// In-memory [`Injector`].
///
/// ```rust
/// use std::sync::Arc;
/// use switchyard::ioc::{self, Bindings, FORMATTER, Injector};
/// use switchyard::format::{Formatter, JsonFormatter};
///
/// let mut bindings = Bindings::new();
/// bindings.bind_formatter("application/json", JsonFormatter);
/// assert!(bindings.has_binding(FORMATTER, Some("application/json")));
///
/// let formatter = ioc::resolve::<dyn Formatter>(&bindings, FORMATTER, Some("application/json"));
/// assert!(formatter.unwrap().is_some());
/// ```
#[derive(Default)]
pub struct Bindings {
    entries: HashMap<(String, Option<String>), Binding>,
    session_scoped: HashSet<String>,
}

type Provider = Arc<dyn Fn() -> Instance + Send + Sync>;

enum Binding {
    Instance(Instance),
    Provider(Provider),
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `instance` under `type_name`. Resolve it back as `T`.
    pub fn bind<T>(&mut self, type_name: &str, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert(type_name, None, instance)
    }

    pub fn bind_named<T>(&mut self, type_name: &str, name: &str, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.insert(type_name, Some(name), instance)
    }

    fn insert<T>(&mut self, type_name: &str, name: Option<&str>, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let erased: Instance = Arc::new(instance);
        self.entries.insert((type_name.to_owned(), name.map(str::to_owned)), Binding::Instance(erased));
        self
    }

    /// Binds `provider`, called for every lookup of `type_name`.
    pub fn bind_provider<T, F>(&mut self, type_name: &str, provider: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let provider: Provider = Arc::new(move || Arc::new(provider()) as Instance);
        self.entries.insert((type_name.to_owned(), None), Binding::Provider(provider));
        self
    }

    /// Resolves `type_name` once per session instead of on every lookup.
    pub fn in_session_scope(&mut self, type_name: &str) -> &mut Self {
        self.session_scoped.insert(type_name.to_owned());
        self
    }

    /// The formatter used for responses negotiated to `mime_type`.
    pub fn bind_formatter<F: Formatter + 'static>(&mut self, mime_type: &str, formatter: F) -> &mut Self {
        let formatter: Arc<dyn Formatter> = Arc::new(formatter);
        self.bind_named(FORMATTER, mime_type, formatter)
    }

    /// Binds a formatter under its own type name, for routes that name a
    /// formatter explicitly.
    pub fn bind_formatter_type<F: Formatter + 'static>(&mut self, formatter: F) -> &mut Self {
        let formatter: Arc<dyn Formatter> = Arc::new(formatter);
        self.bind(type_name::<F>(), formatter)
    }

    /// Binds a processor under its type name, see [`Handler::of`](crate::Handler::of).
    pub fn bind_processor<P: Processor + 'static>(&mut self, processor: P) -> &mut Self {
        let processor: Arc<dyn Processor> = Arc::new(processor);
        self.bind(type_name::<P>(), processor)
    }

    /// Binds a processor created by `provider` on every lookup. Combined
    /// with [`in_session_scope`](Self::in_session_scope) each session gets
    /// its own.
    pub fn bind_processor_with<P, F>(&mut self, provider: F) -> &mut Self
    where
        P: Processor + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.bind_provider(type_name::<P>(), move || Arc::new(provider()) as Arc<dyn Processor>)
    }

    pub fn bind_pre_interceptor<I: PreInterceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        let interceptor: Arc<dyn PreInterceptor> = Arc::new(interceptor);
        self.bind(type_name::<I>(), interceptor)
    }

    pub fn bind_post_interceptor<I: PostInterceptor + 'static>(&mut self, interceptor: I) -> &mut Self {
        let interceptor: Arc<dyn PostInterceptor> = Arc::new(interceptor);
        self.bind(type_name::<I>(), interceptor)
    }
}

impl Injector for Bindings {
    fn has_binding(&self, type_name: &str, name: Option<&str>) -> bool {
        self.entries.contains_key(&(type_name.to_owned(), name.map(str::to_owned)))
    }

    fn instance(&self, type_name: &str, name: Option<&str>) -> Result<Instance> {
        match self.entries.get(&(type_name.to_owned(), name.map(str::to_owned))) {
            Some(Binding::Instance(instance)) => Ok(Arc::clone(instance)),
            Some(Binding::Provider(provider)) => Ok(provider()),
            None => Err(Error::Binding {
                type_name: type_name.to_owned(),
                name: name.map(str::to_owned),
            }),
        }
    }

    fn is_session_scoped(&self, type_name: &str) -> bool {
        self.session_scoped.contains(type_name)
    }
}
