//! End-to-end installer behaviour with in-process fakes for the network and
//! child processes and a real filesystem cache.

use async_trait::async_trait;
use setup_tool_core::{
    CacheKey, CacheQuery, DownloadedArtifact, Error, Fetcher, FsToolCache, HostPlatform,
    InstallEvent, InstallObserver, Installer, PlatformTarget, ProcessOutput, ProcessRunner,
    ReleaseSource, Result, TargetArch, TargetOs, ToolCache, ToolRequest, ToolVersion,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const REPO: &str = "https://releases.example.com/org/tool";

/// Serves canned bodies or status codes and counts requests.
struct FakeFetcher {
    dir: PathBuf,
    responses: HashMap<String, std::result::Result<Vec<u8>, u16>>,
    default: std::result::Result<Vec<u8>, u16>,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            responses: HashMap::new(),
            default: Ok(b"#!/bin/sh\necho tool\n".to_vec()),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    fn failing_with(mut self, status: u16) -> Self {
        self.default = Err(status);
        self
    }

    fn serving(mut self, url: &str, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_vec()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<DownloadedArtifact> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        match self.responses.get(url).unwrap_or(&self.default) {
            Ok(body) => {
                std::fs::create_dir_all(&self.dir).unwrap();
                let path = self.dir.join(format!("download-{n}"));
                std::fs::write(&path, body).unwrap();
                Ok(DownloadedArtifact::new(path))
            }
            Err(status) => Err(Error::http_status(url, *status)),
        }
    }
}

/// Answers `--version` with a fixed stdout and records what it was asked to run.
struct FakeRunner {
    stdout: String,
    exit_code: i32,
    calls: AtomicUsize,
    executable_at_call: Mutex<Vec<bool>>,
}

impl FakeRunner {
    fn reporting(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            exit_code: 0,
            calls: AtomicUsize::new(0),
            executable_at_call: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn output(&self, program: &Path, args: &[&str]) -> Result<ProcessOutput> {
        assert_eq!(args, ["--version"]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executable_at_call
            .lock()
            .unwrap()
            .push(is_executable(program));
        Ok(ProcessOutput {
            exit_code: Some(self.exit_code),
            stdout: self.stdout.clone(),
        })
    }

    async fn run(
        &self,
        _program: &Path,
        _args: &[&str],
        _search_path: Option<&OsStr>,
    ) -> Result<ProcessOutput> {
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: String::new(),
        })
    }
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<InstallEvent>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<InstallEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl InstallObserver for RecordingObserver {
    fn on_event(&self, event: &InstallEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 == 0o111)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.exists()
}

struct Harness {
    temp: TempDir,
    cache: Arc<FsToolCache>,
    fetcher: Arc<FakeFetcher>,
    runner: Arc<FakeRunner>,
    observer: Arc<RecordingObserver>,
    installer: Installer,
}

impl Harness {
    fn new(configure: impl FnOnce(FakeFetcher) -> FakeFetcher, probe_output: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(FsToolCache::new(temp.path().join("cache")));
        let fetcher = Arc::new(configure(FakeFetcher::new(temp.path().join("downloads"))));
        let runner = Arc::new(FakeRunner::reporting(probe_output));
        let observer = Arc::new(RecordingObserver::default());

        let installer = Installer::new(cache.clone(), fetcher.clone(), runner.clone())
            .with_observer(observer.clone())
            .with_source(ReleaseSource::new(REPO))
            .with_host(HostPlatform::new("linux", "x64"));

        Self {
            temp,
            cache,
            fetcher,
            runner,
            observer,
            installer,
        }
    }

    fn standard() -> Self {
        Self::new(|f| f, "tool version v1.2.3 abcdef linux/amd64\n")
    }

    fn seed(&self, version: &str) -> PathBuf {
        let source = self.temp.path().join(format!("seed-{version}"));
        std::fs::write(&source, b"seeded").unwrap();
        self.cache
            .store(
                "tool",
                &CacheKey::concrete(version).unwrap(),
                &source,
                "tool",
                &linux(),
            )
            .unwrap()
            .path
    }

    fn downloads_left(&self) -> usize {
        std::fs::read_dir(self.temp.path().join("downloads")).map_or(0, |d| d.count())
    }
}

fn linux() -> PlatformTarget {
    PlatformTarget::new(TargetOs::Linux, TargetArch::Amd64)
}

fn concrete(v: &str) -> ToolRequest {
    ToolRequest::new("tool", ToolVersion::Concrete(v.to_string()))
}

fn latest() -> ToolRequest {
    ToolRequest::new("tool", ToolVersion::Latest)
}

#[tokio::test]
async fn test_cold_concrete_install_end_to_end() {
    let h = Harness::standard();

    let entry = h.installer.get(&concrete("2.0.0")).await.unwrap();

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(
        h.fetcher.urls(),
        vec![format!("{REPO}/releases/download/v2.0.0/tool-linux-amd64")]
    );
    assert_eq!(entry.version, "2.0.0");
    assert!(entry.path.ends_with("tool/2.0.0/linux-amd64"));
    assert!(is_executable(&entry.path.join("tool")));

    // Concrete requests are never probed
    assert_eq!(h.runner.calls(), 0);

    // The temporary download is gone once promoted
    assert_eq!(h.downloads_left(), 0);

    let stored = h
        .cache
        .lookup(
            "tool",
            CacheQuery::Exact(&CacheKey::concrete("2.0.0").unwrap()),
            &linux(),
        )
        .unwrap();
    assert_eq!(stored, Some(entry));
}

#[tokio::test]
async fn test_concrete_cache_hit_skips_download() {
    let h = Harness::standard();
    let seeded = h.seed("1.0.0");

    let entry = h.installer.get(&concrete("1.0.0")).await.unwrap();

    assert_eq!(entry.path, seeded);
    assert_eq!(h.fetcher.calls(), 0);
    assert!(matches!(
        h.observer.events().as_slice(),
        [InstallEvent::CacheHit { .. }, InstallEvent::Done { .. }]
    ));
}

#[tokio::test]
async fn test_force_refresh_ignored_for_concrete_versions() {
    let h = Harness::standard();
    h.seed("1.0.0");

    h.installer
        .get(&concrete("1.0.0").with_force_refresh(true))
        .await
        .unwrap();

    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_latest_uses_any_cached_version() {
    let h = Harness::standard();
    h.seed("0.9.0");
    let newest = h.seed("0.10.0");

    let entry = h.installer.get(&latest()).await.unwrap();

    assert_eq!(entry.path, newest);
    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(h.runner.calls(), 0);
}

#[tokio::test]
async fn test_latest_with_force_refresh_always_downloads() {
    let h = Harness::standard();
    h.seed("0.9.0");

    let entry = h
        .installer
        .get(&latest().with_force_refresh(true))
        .await
        .unwrap();

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(
        h.fetcher.urls(),
        vec![format!("{REPO}/releases/latest/download/tool-linux-amd64")]
    );
    assert_eq!(entry.version, "1.2.3");
}

#[tokio::test]
async fn test_latest_resolves_reported_version() {
    let h = Harness::standard();

    let entry = h.installer.get(&latest()).await.unwrap();

    assert_eq!(entry.version, "1.2.3");
    assert!(entry.path.ends_with("tool/1.2.3/linux-amd64"));
    assert_eq!(h.runner.calls(), 1);

    // The probe only ever sees an executable file
    assert_eq!(*h.runner.executable_at_call.lock().unwrap(), vec![true]);

    // Never stored under the symbolic name
    assert!(
        h.cache
            .lookup("tool", CacheQuery::Exact(&CacheKey::degraded_latest()), &linux())
            .unwrap()
            .is_none()
    );

    // The resolved version is now a plain cache hit
    let again = h.installer.get(&concrete("1.2.3")).await.unwrap();
    assert_eq!(again.path, entry.path);
    assert_eq!(h.fetcher.calls(), 1);

    let events = h.observer.events();
    assert!(matches!(
        events.as_slice(),
        [
            InstallEvent::Downloading { .. },
            InstallEvent::PermissionFixing { .. },
            InstallEvent::VersionProbing { .. },
            InstallEvent::VersionResolved { .. },
            InstallEvent::Storing { .. },
            InstallEvent::Done { .. },
            InstallEvent::CacheHit { .. },
            InstallEvent::Done { .. },
        ]
    ));
}

#[tokio::test]
async fn test_unrecognized_version_output_is_degraded_not_fatal() {
    let h = Harness::new(|f| f, "tool build 1234 (dev)\n");

    let entry = h.installer.get(&latest()).await.unwrap();

    assert_eq!(entry.version, "latest");
    assert!(is_executable(&entry.path.join("tool")));
    assert!(
        h.observer
            .events()
            .contains(&InstallEvent::VersionProbeDegraded)
    );

    // The degraded entry never satisfies a later latest request
    let again = h.installer.get(&latest()).await.unwrap();
    assert_eq!(again.version, "latest");
    assert_eq!(h.fetcher.calls(), 2);
    assert_eq!(h.runner.calls(), 2);
}

#[tokio::test]
async fn test_probe_exit_failure_fails_install() {
    let temp = TempDir::new().unwrap();
    let cache = Arc::new(FsToolCache::new(temp.path().join("cache")));
    let runner = Arc::new(FakeRunner {
        exit_code: 1,
        ..FakeRunner::reporting("tool version v1.2.3")
    });
    let installer = Installer::new(
        cache.clone(),
        Arc::new(FakeFetcher::new(temp.path().join("downloads"))),
        runner,
    )
    .with_host(HostPlatform::new("linux", "x64"));

    let err = installer.get(&latest()).await.unwrap_err();
    assert!(matches!(err, Error::ProcessFailed { .. }));
    assert!(
        cache
            .lookup("tool", CacheQuery::AnyVersion, &linux())
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_rate_limit_statuses_are_translated() {
    for status in [403, 429] {
        let h = Harness::new(|f| f.failing_with(status), "");

        let err = h.installer.get(&concrete("1.0.0")).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            format!(
                "Received HTTP status code {status}. This usually indicates the rate limit has been exceeded."
            )
        );
        assert!(matches!(
            h.observer.events().last(),
            Some(InstallEvent::Failed { .. })
        ));
    }
}

#[tokio::test]
async fn test_not_found_is_not_a_rate_limit() {
    let h = Harness::new(|f| f.failing_with(404), "");

    let err = h.installer.get(&concrete("9.9.9")).await.unwrap_err();

    assert!(matches!(
        err,
        Error::DownloadFailed {
            status: Some(404),
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("404"));
    assert!(message.contains("/releases/download/v9.9.9/tool-linux-amd64"));
    assert!(!message.contains("rate limit"));

    // Nothing visible in the cache after a failed download
    assert!(
        h.cache
            .lookup("tool", CacheQuery::AnyVersion, &linux())
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_unsupported_host_fails_before_any_io() {
    let h = Harness::standard();
    let installer = Installer::new(h.cache.clone(), h.fetcher.clone(), h.runner.clone())
        .with_host(HostPlatform::new("win32", "arm64"));

    let err = installer.get(&concrete("1.0.0")).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Unsupported architecture: \"arm64\" on platform \"win32\""
    );
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_windows_artifact_keeps_extension() {
    let h = Harness::new(
        |f| {
            f.serving(
                &format!("{REPO}/releases/download/v3.1.0/tool-windows-amd64.exe"),
                b"MZ",
            )
        },
        "",
    );
    let installer = Installer::new(h.cache.clone(), h.fetcher.clone(), h.runner.clone())
        .with_source(ReleaseSource::new(REPO))
        .with_host(HostPlatform::new("win32", "x64"));

    let entry = installer.get(&concrete("3.1.0")).await.unwrap();

    assert!(entry.path.ends_with("tool/3.1.0/windows-amd64"));
    assert_eq!(std::fs::read(entry.path.join("tool.exe")).unwrap(), b"MZ");
}

#[tokio::test]
async fn test_get_path_parses_string_inputs() {
    let h = Harness::standard();

    let path = h.installer.get_path("tool", "latest", false).await.unwrap();
    assert!(path.ends_with("tool/1.2.3/linux-amd64"));

    let err = h.installer.get_path("tool", "", false).await.unwrap_err();
    assert!(matches!(err, Error::InvalidVersion { .. }));
}

#[tokio::test]
async fn test_path_like_version_rejected() {
    let h = Harness::standard();

    let err = h.installer.get(&concrete("../escape")).await.unwrap_err();

    assert!(matches!(err, Error::InvalidVersion { .. }));
    assert_eq!(h.fetcher.calls(), 0);
}
