//! Tool resolution, download and cache core for setup-tool.
//!
//! Given a tool name, a requested version (concrete or `latest`) and a
//! force-refresh flag, [`Installer::get`] picks the release artifact for the
//! host platform, serves it from the tool cache when possible, otherwise
//! downloads it, marks it executable, resolves `latest` to the version the
//! binary reports, stores it in the cache and returns the cached directory.
//!
//! # Example
//!
//! ```ignore
//! use setup_tool_core::{InstallerConfig, ToolRequest, ToolVersion};
//!
//! let installer = InstallerConfig::new().build()?;
//! let request = ToolRequest::new("earthly", ToolVersion::Latest);
//! let entry = installer.get(&request).await?;
//! println!("{}", entry.path.display());
//! ```

pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod installer;
pub mod observer;
pub mod platform;
pub mod probe;
pub mod process;
pub mod release;
pub mod request;

pub use cache::{CacheEntry, CacheKey, CacheQuery, FsToolCache, ToolCache, default_cache_root};
pub use config::InstallerConfig;
pub use download::{DownloadedArtifact, Fetcher, HttpFetcher, make_executable, token_from_env};
pub use error::{Error, Result};
pub use installer::{Installer, translate_error};
pub use observer::{InstallEvent, InstallObserver, TracingObserver};
pub use platform::{HostPlatform, PlatformTarget, TargetArch, TargetOs};
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use release::{DEFAULT_REPOSITORY, ReleaseSource};
pub use request::{LATEST, ToolRequest, ToolVersion};
