//! Error types for tool resolution, download and caching

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for installer operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Host operating system has no published artifact
    #[error("Unsupported platform: \"{os}\"")]
    #[diagnostic(
        code(setup_tool::platform::unsupported_os),
        help("Release artifacts exist for win32, darwin and linux hosts")
    )]
    UnsupportedPlatform {
        /// Raw OS identifier reported by the host
        os: String,
    },

    /// Host CPU architecture has no published artifact for this OS
    #[error("Unsupported architecture: \"{arch}\" on platform \"{os}\"")]
    #[diagnostic(
        code(setup_tool::platform::unsupported_arch),
        help("x64 is available everywhere, arm64 on darwin and linux, arm on linux only")
    )]
    UnsupportedArchitecture {
        /// Raw architecture identifier reported by the host
        arch: String,
        /// Raw OS identifier reported by the host
        os: String,
    },

    /// Requested version string could not be interpreted
    #[error("Invalid version requested: \"{version}\"")]
    #[diagnostic(
        code(setup_tool::request::invalid_version),
        help("Use a concrete version such as 0.8.15, or \"latest\"")
    )]
    InvalidVersion {
        /// The rejected input
        version: String,
    },

    /// Artifact download failed
    #[error("Failed to download {url}: {message}")]
    #[diagnostic(code(setup_tool::download::failed))]
    DownloadFailed {
        /// URL that was requested
        url: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
        /// Transport or status detail
        message: String,
    },

    /// Anonymous download quota of the release store was exhausted
    #[error(
        "Received HTTP status code {status}. This usually indicates the rate limit has been exceeded."
    )]
    #[diagnostic(
        code(setup_tool::download::rate_limited),
        help("Provide a GITHUB_TOKEN to raise the request quota, or retry later")
    )]
    RateLimitExceeded {
        /// HTTP status code (403 or 429)
        status: u16,
    },

    /// A child process could not be run or reported failure
    #[error("Process '{program}' failed: {message}")]
    #[diagnostic(code(setup_tool::process::failed))]
    ProcessFailed {
        /// Program that was executed
        program: String,
        /// What went wrong
        message: String,
    },

    /// Writing an entry into the tool cache failed
    #[error("Failed to store tool in cache at {}", path.display())]
    #[diagnostic(
        code(setup_tool::cache::store),
        help("Check that the tool cache directory is writable")
    )]
    CacheStoreFailure {
        /// Entry location that could not be written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside of the cache store step
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(setup_tool::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "chmod")
        operation: String,
    },

    /// Invalid configuration or workflow input
    #[error("Configuration error: {message}")]
    #[diagnostic(code(setup_tool::config))]
    Configuration {
        /// Description of the problem
        message: String,
    },
}

impl Error {
    /// Create an unsupported platform error
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>) -> Self {
        Self::UnsupportedPlatform { os: os.into() }
    }

    /// Create an unsupported architecture error
    #[must_use]
    pub fn unsupported_architecture(arch: impl Into<String>, os: impl Into<String>) -> Self {
        Self::UnsupportedArchitecture {
            arch: arch.into(),
            os: os.into(),
        }
    }

    /// Create a download error for a non-success HTTP status
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            status: Some(status),
            message: format!("unexpected HTTP response {status}"),
        }
    }

    /// Create a download error for a transport failure (no HTTP status)
    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a process failure error
    #[must_use]
    pub fn process(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessFailed {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a cache store error
    #[must_use]
    pub fn cache_store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheStoreFailure {
            path: path.into(),
            source,
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// HTTP status carried by a download failure, if any.
    #[must_use]
    pub const fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::DownloadFailed { status, .. } => *status,
            Self::RateLimitExceeded { status } => Some(*status),
            _ => None,
        }
    }

    /// Rewrite download failures that signal an exhausted quota.
    ///
    /// 403 and 429 from the release store mean anonymous access was throttled,
    /// not that the tool is missing, so they become [`Error::RateLimitExceeded`].
    /// Every other error is returned untouched.
    #[must_use]
    pub fn into_rate_limited(self) -> Self {
        match self {
            Self::DownloadFailed {
                status: Some(status @ (403 | 429)),
                ..
            } => Self::RateLimitExceeded { status },
            other => other,
        }
    }
}

/// Result type for installer operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_is_exact() {
        let err = Error::http_status("https://example.com/a", 429).into_rate_limited();
        assert_eq!(
            err.to_string(),
            "Received HTTP status code 429. This usually indicates the rate limit has been exceeded."
        );

        let err = Error::http_status("https://example.com/a", 403).into_rate_limited();
        assert!(matches!(err, Error::RateLimitExceeded { status: 403 }));
    }

    #[test]
    fn test_other_statuses_pass_through() {
        let err = Error::http_status("https://example.com/a", 404).into_rate_limited();
        assert_eq!(
            err.to_string(),
            "Failed to download https://example.com/a: unexpected HTTP response 404"
        );
        assert_eq!(err.http_status_code(), Some(404));

        let err = Error::transport("https://example.com/a", "connection refused").into_rate_limited();
        assert!(matches!(err, Error::DownloadFailed { status: None, .. }));
    }

    #[test]
    fn test_non_download_errors_untouched() {
        let err = Error::unsupported_platform("aix").into_rate_limited();
        assert_eq!(err.to_string(), "Unsupported platform: \"aix\"");

        let err = Error::unsupported_architecture("arm", "darwin");
        assert_eq!(
            err.to_string(),
            "Unsupported architecture: \"arm\" on platform \"darwin\""
        );
    }

    #[test]
    fn test_io_error_display() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/tool",
            "chmod",
        );
        assert_eq!(err.to_string(), "I/O chmod failed: /tmp/tool");

        let err = Error::io_no_path(std::io::Error::other("boom"), "read");
        assert_eq!(err.to_string(), "I/O read failed");
    }

    #[test]
    fn test_cache_store_display() {
        let err = Error::cache_store(
            PathBuf::from("/cache/tool/1.0.0"),
            std::io::Error::other("disk full"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to store tool in cache at /cache/tool/1.0.0"
        );
    }
}
