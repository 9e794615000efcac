//! GitHub Actions runner integration: workflow commands and input parsing.

use setup_tool_core::{Error, Result};
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes `::command::` lines understood by the runner.
#[derive(Debug)]
pub struct WorkflowCommands<W: Write> {
    out: W,
}

impl<W: Write> WorkflowCommands<W> {
    /// Write commands to `out` (stdout in production).
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn command(&mut self, name: &str, value: &str) -> Result<()> {
        writeln!(self.out, "::{name}::{}", escape_data(value))
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::io_no_path(e, "write workflow command"))
    }

    /// Start a collapsible log group.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn group(&mut self, title: &str) -> Result<()> {
        self.command("group", title)
    }

    /// Close the current log group.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn end_group(&mut self) -> Result<()> {
        self.command("endgroup", "")
    }

    /// Register a problem matcher file.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn add_matcher(&mut self, path: &Path) -> Result<()> {
        self.command("add-matcher", &path.display().to_string())
    }

    /// Legacy path registration, used when `GITHUB_PATH` is not available.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        self.command("add-path", &path.display().to_string())
    }

    /// Report a failure message for the step.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn error(&mut self, message: &str) -> Result<()> {
        self.command("error", message)
    }
}

/// Escape command data so multi-line messages stay one command.
#[must_use]
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Parse a boolean input using the YAML 1.2 core schema spellings.
///
/// An unset or empty input is `false`.
///
/// # Errors
///
/// Returns [`Error::Configuration`] naming the input for any other spelling.
pub fn parse_boolean_input(name: &str, value: Option<&str>) -> Result<bool> {
    match value.map(str::trim).unwrap_or_default() {
        "" | "false" | "False" | "FALSE" => Ok(false),
        "true" | "True" | "TRUE" => Ok(true),
        _ => Err(Error::configuration(format!(
            "Input does not meet YAML 1.2 \"Core Schema\" specification: {name}. \
             Supported boolean values: `true | True | TRUE | false | False | FALSE`"
        ))),
    }
}

/// Split a list input on newlines and commas, dropping blanks.
#[must_use]
pub fn parse_list_input(value: &str) -> Vec<String> {
    value
        .split(['\n', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Make `dir` visible to later steps and return the search path for this one.
///
/// Appends to the `GITHUB_PATH` file when given, otherwise emits `::add-path::`.
/// The returned value is `dir` followed by the current `PATH`.
///
/// # Errors
///
/// Returns an error if the path file cannot be written.
pub fn add_path<W: Write>(
    dir: &Path,
    github_path: Option<&Path>,
    commands: &mut WorkflowCommands<W>,
) -> Result<OsString> {
    match github_path {
        Some(file) => {
            debug!(file = ?file, dir = ?dir, "Appending to GITHUB_PATH");
            let mut handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .map_err(|e| Error::io(e, file, "open"))?;
            writeln!(handle, "{}", dir.display()).map_err(|e| Error::io(e, file, "write"))?;
        }
        None => commands.add_path(dir)?,
    }

    prepend_path(dir, std::env::var_os("PATH"))
}

fn prepend_path(dir: &Path, current: Option<OsString>) -> Result<OsString> {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(current) = current {
        paths.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(paths)
        .map_err(|e| Error::configuration(format!("Cannot add {} to PATH: {e}", dir.display())))
}

/// Problem matcher files to register.
///
/// Requested names get a `.json` suffix when missing and resolve inside
/// `dir`. With nothing requested, every file under `dir` is used.
///
/// # Errors
///
/// Returns an error if `dir` cannot be turned into a glob pattern.
pub fn matcher_files(requested: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
    if !requested.is_empty() {
        return Ok(requested
            .iter()
            .map(|name| {
                if name.ends_with(".json") {
                    dir.join(name)
                } else {
                    dir.join(format!("{name}.json"))
                }
            })
            .collect());
    }

    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| Error::configuration(format!("Invalid matcher directory pattern: {e}")))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}
