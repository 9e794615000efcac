//! Progress reporting for installs.
//!
//! The installer never logs on its own; it reports [`InstallEvent`]s to an
//! injected [`InstallObserver`]. [`TracingObserver`] forwards them to
//! `tracing`, tests record them.

use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Steps of a single install, in the order they can occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// A cached entry satisfied the request.
    CacheHit { path: PathBuf, version: String },
    /// Download started.
    Downloading { url: String },
    /// Download finished, fixing permissions.
    PermissionFixing { path: PathBuf },
    /// Asking a `latest` download for its version.
    VersionProbing { path: PathBuf },
    /// The download reported a concrete version.
    VersionResolved { version: String },
    /// The download did not report a recognizable version; it is stored as `latest`.
    VersionProbeDegraded,
    /// Copying into the cache.
    Storing { version: String },
    /// Install finished.
    Done { path: PathBuf, version: String },
    /// Install failed; carries the final (translated) message.
    Failed { message: String },
}

/// Sink for install progress.
pub trait InstallObserver: Send + Sync {
    /// Called once per step.
    fn on_event(&self, event: &InstallEvent);
}

/// Observer that writes events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl fmt::Display for InstallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheHit { path, .. } => {
                write!(f, "Found cached version in \"{}\"", path.display())
            }
            Self::Downloading { url } => write!(f, "Downloading from \"{url}\""),
            Self::PermissionFixing { .. } => f.write_str("Adjusting file permissions"),
            Self::VersionProbing { .. } => f.write_str("Resolving version of latest release"),
            Self::VersionResolved { version } => {
                write!(f, "Replacing \"latest\" with reported version: {version}")
            }
            Self::VersionProbeDegraded => f.write_str(
                "Downloaded binary did not report a version; caching it as \"latest\"",
            ),
            Self::Storing { version } => write!(f, "Caching version {version}"),
            Self::Done { path, version } => {
                write!(f, "Using version {version} from \"{}\"", path.display())
            }
            Self::Failed { message } => write!(f, "Install failed: {message}"),
        }
    }
}

impl InstallObserver for TracingObserver {
    fn on_event(&self, event: &InstallEvent) {
        match event {
            InstallEvent::VersionProbeDegraded | InstallEvent::Failed { .. } => warn!("{event}"),
            InstallEvent::CacheHit { path, version } | InstallEvent::Done { path, version } => {
                info!(path = %path.display(), %version, "{event}");
            }
            _ => info!("{event}"),
        }
    }
}
