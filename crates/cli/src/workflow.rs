//! The action step: install, register problem matchers, bootstrap.

use crate::actions::{
    WorkflowCommands, add_path, matcher_files, parse_boolean_input, parse_list_input,
};
use crate::cli::Cli;
use setup_tool_core::{
    Error, Installer, InstallerConfig, ProcessRunner, Result, ToolRequest, ToolVersion,
    token_from_env,
};
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const DOWNLOAD_LATEST_INPUT: &str = "download-latest";
const DOWNLOAD_LATEST_FALLBACK_ENV: &str = "INPUT_DOWNLOAD_LATEST";

/// Resolved step settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// What to install.
    pub request: ToolRequest,
    /// Requested problem matcher names; empty means all of them.
    pub matchers: Vec<String>,
    /// Directory holding problem matcher files.
    pub matchers_dir: PathBuf,
    /// Skip `<tool> bootstrap`.
    pub skip_bootstrap: bool,
    /// Runner PATH file, when set.
    pub github_path: Option<PathBuf>,
}

impl Settings {
    /// Validate the parsed command line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a malformed `download-latest`
    /// input and [`Error::InvalidVersion`] for an empty version.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let raw_download_latest = cli
            .download_latest
            .clone()
            .or_else(|| std::env::var(DOWNLOAD_LATEST_FALLBACK_ENV).ok());
        let download_latest =
            parse_boolean_input(DOWNLOAD_LATEST_INPUT, raw_download_latest.as_deref())?;

        let version = ToolVersion::parse(&cli.tool_version)?;
        let request = ToolRequest::new(cli.tool.trim(), version).with_force_refresh(download_latest);

        Ok(Self {
            request,
            matchers: parse_list_input(&cli.matchers),
            matchers_dir: cli
                .matchers_dir
                .clone()
                .unwrap_or_else(default_matchers_dir),
            skip_bootstrap: cli.skip_bootstrap,
            github_path: cli.github_path.clone().filter(|p| !p.as_os_str().is_empty()),
        })
    }
}

/// Installer settings taken from the command line.
#[must_use]
pub fn installer_config(cli: &Cli) -> InstallerConfig {
    let mut config = InstallerConfig::new()
        .with_repository(cli.repository.clone())
        .with_token(
            cli.token
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(token_from_env),
        );
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir.clone());
    }
    config
}

/// `matchers` next to the directory holding the executable.
fn default_matchers_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("..").join("matchers")))
        .unwrap_or_else(|| PathBuf::from("matchers"))
}

/// Runs the step against an installer and process runner.
pub struct Workflow<'a> {
    settings: &'a Settings,
    installer: &'a Installer,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Workflow<'a> {
    /// Create a workflow.
    #[must_use]
    pub fn new(
        settings: &'a Settings,
        installer: &'a Installer,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            settings,
            installer,
            runner,
        }
    }

    /// Run every group in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first install, process or output error.
    #[instrument(skip_all, fields(tool = %self.settings.request.name))]
    pub async fn run<W: Write>(&self, commands: &mut WorkflowCommands<W>) -> Result<()> {
        let tool = self.settings.request.name.as_str();

        commands.group(&format!("Install {tool}"))?;
        let installed = self.install(commands).await;
        commands.end_group()?;
        let (executable, search_path) = installed?;

        commands.group("Add problem matchers")?;
        let registered = self.add_matchers(commands);
        commands.end_group()?;
        registered?;

        if self.settings.skip_bootstrap {
            info!("Skipping bootstrap");
            return Ok(());
        }

        commands.group(&format!("Bootstrap {tool}"))?;
        let bootstrapped = self
            .passthrough(&executable, "bootstrap", &search_path)
            .await;
        commands.end_group()?;
        bootstrapped
    }

    /// Returns the executable and the `PATH` its child processes run with.
    async fn install<W: Write>(
        &self,
        commands: &mut WorkflowCommands<W>,
    ) -> Result<(PathBuf, OsString)> {
        let entry = self.installer.get(&self.settings.request).await?;

        info!("Adding \"{}\" to the OS path", entry.path.display());
        let search_path = add_path(&entry.path, self.settings.github_path.as_deref(), commands)?;

        let executable = locate(&self.settings.request.name, &search_path)?;
        self.passthrough(&executable, "--version", &search_path)
            .await?;
        Ok((executable, search_path))
    }

    fn add_matchers<W: Write>(&self, commands: &mut WorkflowCommands<W>) -> Result<()> {
        for file in matcher_files(&self.settings.matchers, &self.settings.matchers_dir)? {
            commands.add_matcher(&file)?;
        }
        Ok(())
    }

    async fn passthrough(&self, executable: &Path, arg: &str, search_path: &OsStr) -> Result<()> {
        self.runner
            .run(executable, &[arg], Some(search_path))
            .await?
            .check(executable)?;
        Ok(())
    }
}

fn locate(tool: &str, search_path: &OsString) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| Error::io_no_path(e, "current_dir"))?;
    which::which_in(tool, Some(search_path), cwd)
        .map_err(|e| Error::process(tool, format!("not found on PATH: {e}")))
}
