//! Pre- and post-processing interceptors.
//!
//! Interceptors run around the processor of a route: all pre-interceptors
//! before it, all post-interceptors after it. Global interceptors (see
//! [`Routing::pre_intercept`](crate::Routing::pre_intercept)) run before the
//! ones declared on the route.
//!
//! An interceptor is referenced in one of three ways:
//!
//! - `Interceptor::of::<T>()` or a type name string: resolved through the
//!   [`Injector`] when the chain reaches it,
//! - an instance,
//! - a plain function, which can never stop the chain.
//!
//! Deferred interceptors are resolved per request, through the request's
//! session when one is attached.
//!
//! Returning `Ok(false)` stops the chain and skips everything after it,
//! including the processor for pre-interceptors.

mod cors;

pub use cors::AddAccessControlAllowOriginHeader;

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::ioc::{self, Injector};
use crate::request::Request;
use crate::response::Response;
use crate::session::request_injector;

/// Runs before the processor. `Ok(false)` cancels the request.
pub trait PreInterceptor: Send + Sync {
    fn pre_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;
}

/// Runs after the processor. `Ok(false)` skips the remaining post-interceptors.
pub trait PostInterceptor: Send + Sync {
    fn post_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;
}

/// Interceptor written as a plain function.
pub type InterceptorFn = Arc<dyn Fn(&mut Request, &mut dyn Response) + Send + Sync>;

/// A reference to a pre- or post-interceptor.
pub enum Interceptor<T: ?Sized> {
    /// Type name resolved through the injector when the chain runs.
    Deferred(String),
    Instance(Arc<T>),
    Function(InterceptorFn),
}

pub type PreRef = Interceptor<dyn PreInterceptor>;
pub type PostRef = Interceptor<dyn PostInterceptor>;

impl<T: ?Sized> Interceptor<T> {
    pub fn deferred(type_name: impl Into<String>) -> Self {
        Self::Deferred(type_name.into())
    }

    /// Deferred reference to `I`, bound with
    /// [`Bindings::bind_pre_interceptor`](crate::ioc::Bindings::bind_pre_interceptor)
    /// or its post counterpart.
    pub fn of<I: 'static>() -> Self {
        Self::Deferred(type_name::<I>().to_owned())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut dyn Response) + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }
}

impl Interceptor<dyn PreInterceptor> {
    pub fn instance<I: PreInterceptor + 'static>(interceptor: I) -> Self {
        Self::Instance(Arc::new(interceptor))
    }
}

impl Interceptor<dyn PostInterceptor> {
    pub fn instance<I: PostInterceptor + 'static>(interceptor: I) -> Self {
        Self::Instance(Arc::new(interceptor))
    }
}

impl<T: ?Sized> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Deferred(name) => Self::Deferred(name.clone()),
            Self::Instance(instance) => Self::Instance(Arc::clone(instance)),
            Self::Function(f) => Self::Function(Arc::clone(f)),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(name) => f.debug_tuple("Deferred").field(name).finish(),
            Self::Instance(_) => f.write_str("Instance"),
            Self::Function(_) => f.write_str("Function"),
        }
    }
}

impl<T: ?Sized> From<&str> for Interceptor<T> {
    fn from(type_name: &str) -> Self { Self::deferred(type_name) }
}

impl<T: ?Sized> From<String> for Interceptor<T> {
    fn from(type_name: String) -> Self { Self::Deferred(type_name) }
}

impl<I: PreInterceptor + 'static> From<I> for Interceptor<dyn PreInterceptor> {
    fn from(interceptor: I) -> Self { Self::instance(interceptor) }
}

impl<I: PostInterceptor + 'static> From<I> for Interceptor<dyn PostInterceptor> {
    fn from(interceptor: I) -> Self { Self::instance(interceptor) }
}

// ── Chain execution ───────────────────────────────────────────────────────────

/// Unifies pre and post interceptors for the shared chain runner.
pub(crate) trait Stage: Send + Sync + 'static {
    const KIND: &'static str;
    fn run(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool>;
}

impl Stage for dyn PreInterceptor {
    const KIND: &'static str = "pre interceptor";

    fn run(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        self.pre_process(request, response)
    }
}

impl Stage for dyn PostInterceptor {
    const KIND: &'static str = "post interceptor";

    fn run(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        self.post_process(request, response)
    }
}

fn run_chain<T: ?Sized + Stage>(
    injector: &dyn Injector,
    chain: &[Interceptor<T>],
    request: &mut Request,
    response: &mut dyn Response,
) -> Result<bool> {
    for interceptor in chain {
        let proceed = match interceptor {
            Interceptor::Function(f) => {
                f(request, response);
                true
            }
            Interceptor::Instance(instance) => instance.run(request, response)?,
            Interceptor::Deferred(name) => match ioc::resolve::<T>(injector, name, None)? {
                Some(instance) => instance.run(request, response)?,
                None => {
                    warn!(interceptor = %name, "bound instance has the wrong capability");
                    response.internal_server_error(&format!(
                        "Configured {} {name} is not a {}",
                        T::KIND,
                        T::KIND,
                    ));
                    return Ok(false);
                }
            },
        };

        if !proceed {
            debug!(?interceptor, kind = T::KIND, "interceptor stopped the chain");
            return Ok(false);
        }
    }
    Ok(true)
}

/// The ordered interceptors of one selected route.
#[derive(Clone)]
pub struct Interceptors {
    injector: Arc<dyn Injector>,
    pre: Vec<PreRef>,
    post: Vec<PostRef>,
}

impl Interceptors {
    pub fn new(injector: Arc<dyn Injector>, pre: Vec<PreRef>, post: Vec<PostRef>) -> Self {
        Self { injector, pre, post }
    }

    pub fn pre(&self) -> &[PreRef] { &self.pre }
    pub fn post(&self) -> &[PostRef] { &self.post }

    /// Runs all pre-interceptors in order. `Ok(false)` when one stopped the chain.
    pub fn pre_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        let injector = request_injector(&self.injector, request);
        run_chain(&*injector, &self.pre, request, response)
    }

    /// Runs all post-interceptors in order. `Ok(false)` when one stopped the chain.
    pub fn post_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
        let injector = request_injector(&self.injector, request);
        run_chain(&*injector, &self.post, request, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ioc::Bindings;
    use crate::response::{Body, WebResponse};
    use crate::status::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Append(&'static str, bool);

    impl PreInterceptor for Append {
        fn pre_process(&self, _: &mut Request, response: &mut dyn Response) -> Result<bool> {
            let body = format!("{}{}", response.body().unwrap_or_default(), self.0);
            response.write(Body::Text(body));
            Ok(self.1)
        }
    }

    impl PostInterceptor for Append {
        fn post_process(&self, request: &mut Request, response: &mut dyn Response) -> Result<bool> {
            self.pre_process(request, response)
        }
    }

    struct Failing;

    impl PreInterceptor for Failing {
        fn pre_process(&self, _: &mut Request, _: &mut dyn Response) -> Result<bool> {
            Err(Error::msg("failing interceptor"))
        }
    }

    fn request() -> Request {
        Request::new("GET", "http://example.com/").unwrap()
    }

    fn chain(bindings: Bindings, pre: Vec<PreRef>, post: Vec<PostRef>) -> Interceptors {
        Interceptors::new(Arc::new(bindings), pre, post)
    }

    #[test]
    fn runs_in_order_until_one_returns_false() {
        let interceptors = chain(
            Bindings::new(),
            vec![Append("a", true).into(), Append("b", false).into(), Append("c", true).into()],
            vec![],
        );
        let mut response = WebResponse::default();
        assert!(!interceptors.pre_process(&mut request(), &mut response).unwrap());
        assert_eq!(response.body(), Some("ab"));
    }

    #[test]
    fn functions_always_continue() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let interceptors = chain(
            Bindings::new(),
            vec![],
            vec![
                Interceptor::function(move |_, _| { counted.fetch_add(1, Ordering::SeqCst); }),
                Append("z", true).into(),
            ],
        );
        let mut response = WebResponse::default();
        assert!(interceptors.post_process(&mut request(), &mut response).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.body(), Some("z"));
    }

    #[test]
    fn deferred_references_resolve_through_injector() {
        let mut bindings = Bindings::new();
        bindings.bind_pre_interceptor(Append("x", true));
        let interceptors = chain(bindings, vec![Interceptor::of::<Append>()], vec![]);
        let mut response = WebResponse::default();
        assert!(interceptors.pre_process(&mut request(), &mut response).unwrap());
        assert_eq!(response.body(), Some("x"));
    }

    #[test]
    fn deferred_reference_with_wrong_capability_is_500() {
        let mut bindings = Bindings::new();
        bindings.bind_pre_interceptor(Append("x", true));
        let interceptors = chain(bindings, vec![], vec![Interceptor::of::<Append>()]);
        let mut response = WebResponse::default();
        assert!(!interceptors.post_process(&mut request(), &mut response).unwrap());
        assert_eq!(response.status(), Status::InternalServerError);
        assert!(response.is_fixed());
    }

    #[test]
    fn unbound_reference_and_failures_propagate() {
        let interceptors = chain(Bindings::new(), vec!["NotBound".into()], vec![]);
        let mut response = WebResponse::default();
        assert!(matches!(
            interceptors.pre_process(&mut request(), &mut response),
            Err(Error::Binding { .. }),
        ));

        let interceptors = chain(Bindings::new(), vec![Failing.into()], vec![]);
        assert!(interceptors.pre_process(&mut request(), &mut response).is_err());
    }
}
