//! HTTP protocol version.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Major/minor protocol version as carried on the request and status lines.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

impl HttpVersion {
    pub const HTTP_1_0: HttpVersion = HttpVersion { major: 1, minor: 0 };
    pub const HTTP_1_1: HttpVersion = HttpVersion { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub fn major(self) -> u8 { self.major }
    pub fn minor(self) -> u8 { self.minor }

    /// Only HTTP/1.0 and HTTP/1.1 responses can be assembled.
    pub fn is_supported(self) -> bool {
        self == Self::HTTP_1_0 || self == Self::HTTP_1_1
    }
}

impl Default for HttpVersion {
    fn default() -> Self { Self::HTTP_1_1 }
}

/// Renders as `1.1`, the form used after `HTTP/` on the status line.
impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Accepts `HTTP/1.1` as well as the bare `1.1`.
impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw.strip_prefix("HTTP/").unwrap_or(raw);
        let invalid = || Error::invalid(format!("invalid HTTP version `{s}`"));
        let (major, minor) = raw.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl From<http::Version> for HttpVersion {
    fn from(v: http::Version) -> Self {
        match v {
            http::Version::HTTP_09 => Self::new(0, 9),
            http::Version::HTTP_10 => Self::HTTP_1_0,
            http::Version::HTTP_2  => Self::new(2, 0),
            http::Version::HTTP_3  => Self::new(3, 0),
            _                      => Self::HTTP_1_1,
        }
    }
}
