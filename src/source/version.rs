//! Server version parsing and ordering.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::source::SourceError;

/// Two-part `major.minor` server version.
///
/// Ordered component-wise, so `5.10 > 5.7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse the leading `major.minor` of a server version string.
    ///
    /// Suffixes such as `-0ubuntu0.22.04.1` or `-MariaDB` are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbscrape::source::ServerVersion;
    ///
    /// let v = ServerVersion::parse("8.0.35-0ubuntu0.22.04.1").unwrap();
    /// assert_eq!(v, ServerVersion::new(8, 0));
    /// ```
    pub fn parse(s: &str) -> Result<Self, SourceError> {
        static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

        let regex = VERSION_REGEX.get_or_init(|| {
            Regex::new(r"^\s*(\d+)\.(\d+)").expect("failed to compile version regex")
        });

        let caps = regex
            .captures(s)
            .ok_or_else(|| SourceError::Version(s.to_string()))?;
        let major = caps[1]
            .parse()
            .map_err(|_| SourceError::Version(s.to_string()))?;
        let minor = caps[2]
            .parse()
            .map_err(|_| SourceError::Version(s.to_string()))?;

        Ok(Self { major, minor })
    }
}

impl FromStr for ServerVersion {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
