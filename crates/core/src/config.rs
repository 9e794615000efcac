//! Installer configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::Result;
use crate::cache::{FsToolCache, default_cache_root};
use crate::download::{HttpFetcher, default_temp_dir};
use crate::installer::Installer;
use crate::observer::{InstallObserver, TracingObserver};
use crate::process::TokioProcessRunner;
use crate::release::{DEFAULT_REPOSITORY, ReleaseSource};

/// Options for building a production [`Installer`].
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Custom cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Custom directory for in-flight downloads.
    pub temp_dir: Option<PathBuf>,
    /// Release repository URL.
    pub repository: String,
    /// Bearer token for downloads.
    pub token: Option<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            temp_dir: None,
            repository: DEFAULT_REPOSITORY.to_string(),
            token: None,
        }
    }
}

impl InstallerConfig {
    /// Create config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, path: PathBuf) -> Self {
        self.cache_dir = Some(path);
        self
    }

    /// Set the download directory.
    #[must_use]
    pub fn with_temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = Some(path);
        self
    }

    /// Set the release repository.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Set the download token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Get the cache directory, defaulting to the runner tool cache.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_root)
    }

    /// Get the download directory, defaulting to the runner temp dir.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(default_temp_dir)
    }

    /// Build an installer reporting to `tracing`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(&self) -> Result<Installer> {
        self.build_with_observer(Arc::new(TracingObserver))
    }

    /// Build an installer reporting to `observer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build_with_observer(&self, observer: Arc<dyn InstallObserver>) -> Result<Installer> {
        let fetcher = HttpFetcher::new(self.temp_dir())?.with_token(self.token.clone());
        Ok(Installer::new(
            Arc::new(FsToolCache::new(self.cache_dir())),
            Arc::new(fetcher),
            Arc::new(TokioProcessRunner),
        )
        .with_observer(observer)
        .with_source(ReleaseSource::new(self.repository.clone())))
    }
}
