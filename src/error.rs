//! Unified error type.

use thiserror::Error as ThisError;

/// The error type returned by switchyard's fallible operations.
///
/// Request-level failures (404, 405, 500 …) are expressed on the
/// [`Response`](crate::Response), not as `Error`s. This type covers bad
/// configuration, unresolvable bindings, failures raised by processors or
/// interceptors, and transport problems.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A configuration value was rejected (unknown method, bad pattern …).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The injector has no binding for the requested type.
    #[error("no binding for {type_name}{}", .name.as_deref().map(|n| format!(" named {n}")).unwrap_or_default())]
    Binding {
        type_name: String,
        name: Option<String>,
    },

    /// Raised by processors and interceptors; becomes a 500 response.
    #[error("{0}")]
    Processing(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Shortcut for [`Error::Processing`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
