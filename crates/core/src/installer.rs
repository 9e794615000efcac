//! Resolve, download and cache a tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

use crate::cache::{CacheEntry, CacheKey, CacheQuery, ToolCache};
use crate::download::{Fetcher, make_executable};
use crate::observer::{InstallEvent, InstallObserver, TracingObserver};
use crate::platform::{HostPlatform, PlatformTarget};
use crate::probe::probe_version;
use crate::process::ProcessRunner;
use crate::release::ReleaseSource;
use crate::request::{ToolRequest, ToolVersion};
use crate::{Error, Result};

/// Installs tools into a [`ToolCache`].
///
/// Steps run strictly in order:
///
/// ```text
/// platform -> cache lookup -> download -> chmod -> version probe (latest only) -> cache store
/// ```
///
/// A cache hit ends the install right after the lookup. The lookup is skipped
/// when a `latest` request forces a refresh.
pub struct Installer {
    cache: Arc<dyn ToolCache>,
    fetcher: Arc<dyn Fetcher>,
    runner: Arc<dyn ProcessRunner>,
    observer: Arc<dyn InstallObserver>,
    source: ReleaseSource,
    host: Option<HostPlatform>,
}

impl Installer {
    /// Create an installer with the default release source and a tracing observer.
    #[must_use]
    pub fn new(
        cache: Arc<dyn ToolCache>,
        fetcher: Arc<dyn Fetcher>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            runner,
            observer: Arc::new(TracingObserver),
            source: ReleaseSource::default(),
            host: None,
        }
    }

    /// Report progress to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn InstallObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Download from `source`.
    #[must_use]
    pub fn with_source(mut self, source: ReleaseSource) -> Self {
        self.source = source;
        self
    }

    /// Use fixed host identifiers instead of detecting them on each install.
    #[must_use]
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = Some(host);
        self
    }

    /// Release source in use.
    #[must_use]
    pub fn source(&self) -> &ReleaseSource {
        &self.source
    }

    /// Make `request` available and return its cache entry.
    ///
    /// The entry's `path` is the directory holding the executable.
    ///
    /// # Errors
    ///
    /// Fails on unsupported hosts, download failures (403/429 become
    /// [`Error::RateLimitExceeded`]), probe process failures and cache errors.
    /// A `latest` download that does not report its version is not an error;
    /// it is cached under `latest`.
    #[instrument(skip(self), fields(tool = %request.name, version = %request.version))]
    pub async fn get(&self, request: &ToolRequest) -> Result<CacheEntry> {
        match self.install(request).await {
            Ok(entry) => {
                self.observer.on_event(&InstallEvent::Done {
                    path: entry.path.clone(),
                    version: entry.version.clone(),
                });
                Ok(entry)
            }
            Err(err) => {
                let err = translate_error(err);
                self.observer.on_event(&InstallEvent::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// [`Installer::get`] with string inputs, returning the directory only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] for an empty version, otherwise as
    /// [`Installer::get`].
    pub async fn get_path(
        &self,
        name: &str,
        version: &str,
        force_refresh: bool,
    ) -> Result<PathBuf> {
        let request =
            ToolRequest::new(name, ToolVersion::parse(version)?).with_force_refresh(force_refresh);
        self.get(&request).await.map(|entry| entry.path)
    }

    async fn install(&self, request: &ToolRequest) -> Result<CacheEntry> {
        let host = self.host.clone().unwrap_or_else(HostPlatform::detect);
        let target = PlatformTarget::from_host(&host)?;
        let tool = request.name.as_str();

        if !request.skips_cache() {
            let exact;
            let query = match &request.version {
                ToolVersion::Latest => CacheQuery::AnyVersion,
                ToolVersion::Concrete(v) => {
                    exact = CacheKey::concrete(v.as_str())?;
                    CacheQuery::Exact(&exact)
                }
            };
            if let Some(entry) = self.cache.lookup(tool, query, &target)? {
                self.observer.on_event(&InstallEvent::CacheHit {
                    path: entry.path.clone(),
                    version: entry.version.clone(),
                });
                return Ok(entry);
            }
        }

        let url = self.source.artifact_url(tool, &request.version, &target);
        self.observer
            .on_event(&InstallEvent::Downloading { url: url.clone() });
        let artifact = self.fetcher.fetch(&url).await?;

        self.observer.on_event(&InstallEvent::PermissionFixing {
            path: artifact.path().to_path_buf(),
        });
        make_executable(artifact.path())?;

        let key = match &request.version {
            ToolVersion::Concrete(v) => CacheKey::concrete(v.as_str())?,
            ToolVersion::Latest => self.resolve_latest(artifact.path()).await?,
        };

        self.observer.on_event(&InstallEvent::Storing {
            version: key.to_string(),
        });
        self.cache.store(
            tool,
            &key,
            artifact.path(),
            &target.binary_name(tool),
            &target,
        )
    }

    async fn resolve_latest(&self, binary: &Path) -> Result<CacheKey> {
        self.observer.on_event(&InstallEvent::VersionProbing {
            path: binary.to_path_buf(),
        });

        let reported = probe_version(self.runner.as_ref(), binary).await?;
        match reported.map(CacheKey::concrete) {
            Some(Ok(key)) => {
                self.observer.on_event(&InstallEvent::VersionResolved {
                    version: key.to_string(),
                });
                Ok(key)
            }
            // Unreadable or unusable version: keep the artifact under the literal key
            Some(Err(_)) | None => {
                self.observer.on_event(&InstallEvent::VersionProbeDegraded);
                Ok(CacheKey::degraded_latest())
            }
        }
    }
}

/// Translate internal failures into what the caller reports.
///
/// Throttled downloads (403/429) become [`Error::RateLimitExceeded`];
/// everything else is unchanged.
#[must_use]
pub fn translate_error(err: Error) -> Error {
    err.into_rate_limited()
}
