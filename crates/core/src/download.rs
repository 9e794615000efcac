//! Artifact download into private temporary files.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::{Error, Result};

/// A freshly downloaded artifact.
///
/// The file is removed when this value is dropped, so an artifact that never
/// makes it into the cache does not outlive the install attempt.
#[derive(Debug)]
pub struct DownloadedArtifact {
    path: PathBuf,
}

impl DownloadedArtifact {
    /// Take ownership of a downloaded file.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                trace!(path = ?self.path, error = %e, "Failed to remove downloaded artifact");
            }
            _ => {}
        }
    }
}

/// Network fetch primitive.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` into a private temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DownloadFailed`] for transport failures and non-2xx
    /// responses (carrying the status code when there is one).
    async fn fetch(&self, url: &str) -> Result<DownloadedArtifact>;
}

/// HTTP fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    temp_dir: PathBuf,
    token: Option<String>,
}

impl HttpFetcher {
    /// Create a fetcher writing downloads under `temp_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built
    /// (TLS backend initialization failure).
    pub fn new(temp_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("setup-tool/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            temp_dir,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Directory downloads are written to.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<DownloadedArtifact> {
        debug!(%url, "Downloading artifact");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| Error::transport(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(url, status.as_u16()));
        }

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| Error::io(e, &self.temp_dir, "create"))?;

        // Owned from here on: any early return below deletes the partial file
        let artifact =
            DownloadedArtifact::new(self.temp_dir.join(uuid::Uuid::new_v4().to_string()));
        let mut file = tokio::fs::File::create(artifact.path())
            .await
            .map_err(|e| Error::io(e, artifact.path(), "create"))?;

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::transport(url, e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, artifact.path(), "write"))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| Error::io(e, artifact.path(), "write"))?;

        debug!(%url, bytes = written, path = ?artifact.path(), "Downloaded artifact");
        Ok(artifact)
    }
}

/// Read an auth token from `GITHUB_TOKEN`, then `GH_TOKEN`.
#[must_use]
pub fn token_from_env() -> Option<String> {
    ["GITHUB_TOKEN", "GH_TOKEN"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|t| !t.is_empty()))
}

/// Directory for downloads: the runner temp dir when present, else the OS one.
#[must_use]
pub fn default_temp_dir() -> PathBuf {
    std::env::var_os("RUNNER_TEMP")
        .filter(|v| !v.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from)
        .join("setup-tool")
}

/// Mark a file `rwxr-xr-x`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the permissions cannot be changed.
pub fn make_executable(path: &Path) -> Result<()> {
    set_executable_bits(path).map_err(|e| Error::io(e, path, "chmod"))
}

#[cfg(unix)]
pub(crate) fn set_executable_bits(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub(crate) fn set_executable_bits(path: &Path) -> std::io::Result<()> {
    // Executability follows the file extension here; just confirm the file exists
    std::fs::metadata(path).map(|_| ())
}
