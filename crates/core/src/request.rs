//! Install requests and the requested version.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Literal accepted as the symbolic newest-release request.
pub const LATEST: &str = "latest";

/// Version requested for a tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolVersion {
    /// Whatever the newest published release is.
    Latest,
    /// An explicit release version such as `0.8.15`.
    Concrete(String),
}

impl ToolVersion {
    /// Parse a requested version.
    ///
    /// `latest` selects the newest release; any other non-empty string is used
    /// verbatim as a concrete version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] for an empty or whitespace-only input.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(Error::InvalidVersion {
                version: s.to_string(),
            }),
            LATEST => Ok(Self::Latest),
            other => Ok(Self::Concrete(other.to_string())),
        }
    }

    /// Whether this is the symbolic `latest` request.
    #[must_use]
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }

    /// Concrete version string, if any.
    #[must_use]
    pub fn as_concrete(&self) -> Option<&str> {
        match self {
            Self::Latest => None,
            Self::Concrete(v) => Some(v),
        }
    }
}

impl FromStr for ToolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Concrete(v) => f.write_str(v),
        }
    }
}

/// A single install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Tool name, used for the artifact name and the cache namespace.
    pub name: String,
    /// Requested version.
    pub version: ToolVersion,
    /// Skip any cached `latest` match and download again.
    ///
    /// Has no effect on concrete versions.
    pub force_refresh: bool,
}

impl ToolRequest {
    /// Create a request.
    #[must_use]
    pub fn new(name: impl Into<String>, version: ToolVersion) -> Self {
        Self {
            name: name.into(),
            version,
            force_refresh: false,
        }
    }

    /// Set force refresh.
    #[must_use]
    pub const fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Whether the cache lookup must be skipped for this request.
    #[must_use]
    pub const fn skips_cache(&self) -> bool {
        self.force_refresh && self.version.is_latest()
    }
}
