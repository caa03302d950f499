//! HTTP request methods.
//!
//! Routes store their allowed methods as [`Method`] values. Method names
//! are parsed when a route is declared, so a typo fails at startup with
//! [`Error::InvalidArgument`] instead of a route that never matches.
//! Requests themselves keep the method as sent; a request with a method
//! not listed here simply matches no route.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

macro_rules! methods {
    ($($variant:ident => $token:literal,)+) => {
        /// A method a route can be declared for: RFC 9110 plus `PATCH`.
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum Method {
            $($variant,)+
        }

        impl Method {
            pub const ALL: &'static [Method] = &[$(Method::$variant,)+];

            /// The wire token, e.g. `"GET"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        /// Case-sensitive, as tokens are on the wire.
        impl FromStr for Method {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    other => Err(Error::invalid(format!("unknown request method `{other}`"))),
                }
            }
        }
    };
}

methods! {
    Get     => "GET",
    Head    => "HEAD",
    Post    => "POST",
    Put     => "PUT",
    Delete  => "DELETE",
    Options => "OPTIONS",
    Patch   => "PATCH",
    Connect => "CONNECT",
    Trace   => "TRACE",
}

impl Method {
    /// Methods a route answers to when it was declared without any.
    pub const STANDARD: [Method; 5] = [Method::Get, Method::Head, Method::Post, Method::Put, Method::Delete];

    pub fn is_standard(self) -> bool {
        Self::STANDARD.contains(&self)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
