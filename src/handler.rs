//! Route handlers and type erasure.
//!
//! # How handlers are stored
//!
//! A route holds exactly one [`Handler`], whatever the application wrote:
//!
//! ```text
//! fn hello(req, res, path) -> Result<()> { … }   ← plain function
//!        ↓ routing.on_get("/hello", hello)
//! Handler::Function(Arc<dyn Fn …>)                ← From<F> blanket impl
//!
//! struct Hello; impl Processor for Hello { … }
//!        ↓ Handler::instance(Hello)
//! Handler::Instance(Arc<dyn Processor>)
//!
//!        ↓ Handler::of::<Hello>()
//! Handler::Deferred { type_name, requirements }   ← resolved per request
//! ```
//!
//! Deferred handlers are looked up in the [`Injector`] right before they
//! run, so the processor may depend on request-scoped state. Their
//! [`Requirements`] are captured when the route is declared, which keeps
//! route selection free of injector lookups.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::ioc::{self, Injector};
use crate::request::Request;
use crate::response::Response;
use crate::uri::UriPath;

// ── Processor ─────────────────────────────────────────────────────────────────

/// Access requirements a processor declares about itself.
///
/// Explicit settings on the [`Route`](crate::Route) take precedence; these
/// are consulted when the route leaves a requirement unset.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Requirements {
    pub https: bool,
    pub login: bool,
    pub role: Option<String>,
}

/// Produces the response for a matched route.
pub trait Processor: Send + Sync {
    fn process(&self, request: &mut Request, response: &mut dyn Response, path: &UriPath) -> Result<()>;

    fn requirements(&self) -> Requirements {
        Requirements::default()
    }
}

/// Signature of a handler written as a plain function or closure.
pub type ProcessFn = dyn Fn(&mut Request, &mut dyn Response, &UriPath) -> Result<()> + Send + Sync;

// ── Handler ───────────────────────────────────────────────────────────────────

/// The processor of a route.
#[derive(Clone)]
pub enum Handler {
    Function(Arc<ProcessFn>),
    Instance(Arc<dyn Processor>),
    Deferred {
        type_name: String,
        requirements: Requirements,
    },
}

impl Handler {
    /// Wraps a closure. Prefer this over `into()` for closures: the
    /// argument types are inferred.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut Request, &mut dyn Response, &UriPath) -> Result<()> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn instance<P: Processor + 'static>(processor: P) -> Self {
        Self::Instance(Arc::new(processor))
    }

    /// Processor resolved through the injector under `type_name`, without
    /// requirements of its own.
    pub fn deferred(type_name: impl Into<String>) -> Self {
        Self::Deferred { type_name: type_name.into(), requirements: Requirements::default() }
    }

    /// Processor `P` resolved through the injector per request. Its
    /// requirements are read once from `P::default()`.
    pub fn of<P: Processor + Default + 'static>() -> Self {
        Self::Deferred {
            type_name: type_name::<P>().to_owned(),
            requirements: P::default().requirements(),
        }
    }

    pub fn requirements(&self) -> Requirements {
        match self {
            Self::Function(_) => Requirements::default(),
            Self::Instance(processor) => processor.requirements(),
            Self::Deferred { requirements, .. } => requirements.clone(),
        }
    }

    /// Runs the handler. `Ok(false)` when the request was cancelled or the
    /// deferred processor could not be used.
    pub(crate) fn invoke(
        &self,
        injector: &dyn Injector,
        request: &mut Request,
        response: &mut dyn Response,
        path: &UriPath,
    ) -> Result<bool> {
        match self {
            Self::Function(f) => f(request, response, path)?,
            Self::Instance(processor) => processor.process(request, response, path)?,
            Self::Deferred { type_name, .. } => match ioc::resolve::<dyn Processor>(injector, type_name, None)? {
                Some(processor) => processor.process(request, response, path)?,
                None => {
                    warn!(processor = %type_name, "bound instance is not a processor");
                    response.internal_server_error(&format!(
                        "Configured callback class {type_name} is not a processor"
                    ));
                    return Ok(false);
                }
            },
        }
        Ok(!request.is_cancelled())
    }
}

impl<F> From<F> for Handler
where
    F: Fn(&mut Request, &mut dyn Response, &UriPath) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::Function(Arc::new(f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function"),
            Self::Instance(_) => f.write_str("Instance"),
            Self::Deferred { type_name, requirements } => f
                .debug_struct("Deferred")
                .field("type_name", type_name)
                .field("requirements", requirements)
                .finish(),
        }
    }
}
