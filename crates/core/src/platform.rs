//! Host platform detection and mapping to release artifact tokens.
//!
//! Release artifacts are named with Go-style tokens (`linux-amd64`,
//! `darwin-arm64`, `windows-amd64.exe`). The host is described with the
//! identifiers used by CI runners (`win32`, `x64`, ...) and mapped through a
//! fixed support table; anything outside the table is rejected with the raw
//! value that was reported.

use std::fmt;

use crate::{Error, Result};

/// Raw host identifiers, before mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    /// OS identifier (`win32`, `darwin`, `linux`, ...).
    pub os: String,
    /// CPU identifier (`x64`, `arm64`, `arm`, ...).
    pub arch: String,
}

impl HostPlatform {
    /// Create a host description from raw identifiers.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Describe the machine this process runs on.
    ///
    /// Rust target names are translated to runner identifiers; unknown values
    /// pass through unchanged so the mapper can report them.
    #[must_use]
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "windows" => "win32",
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Operating system token used in artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Windows,
    Darwin,
    Linux,
}

impl TargetOs {
    /// Map a raw host OS identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for identifiers outside the table.
    pub fn from_host(os: &str) -> Result<Self> {
        match os {
            "win32" => Ok(Self::Windows),
            "darwin" => Ok(Self::Darwin),
            "linux" => Ok(Self::Linux),
            other => Err(Error::unsupported_platform(other)),
        }
    }

    /// Executable suffix on this OS.
    #[must_use]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Darwin | Self::Linux => "",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// CPU architecture token used in artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    Amd64,
    Arm7,
    Arm64,
}

impl TargetArch {
    /// Map a raw host CPU identifier, given the already mapped OS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedArchitecture`] when the identifier is
    /// unknown or has no artifact for `os`.
    pub fn from_host(arch: &str, os: TargetOs, raw_os: &str) -> Result<Self> {
        match (arch, os) {
            ("x64", _) => Ok(Self::Amd64),
            ("arm64", TargetOs::Darwin | TargetOs::Linux) => Ok(Self::Arm64),
            ("arm", TargetOs::Linux) => Ok(Self::Arm7),
            _ => Err(Error::unsupported_architecture(arch, raw_os)),
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm7 => write!(f, "arm7"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Artifact platform selected for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTarget {
    pub os: TargetOs,
    pub arch: TargetArch,
}

impl PlatformTarget {
    /// Create a target directly.
    #[must_use]
    pub const fn new(os: TargetOs, arch: TargetArch) -> Self {
        Self { os, arch }
    }

    /// Map raw host identifiers to an artifact platform.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] or
    /// [`Error::UnsupportedArchitecture`] carrying the offending raw value.
    pub fn resolve(os: &str, arch: &str) -> Result<Self> {
        let target_os = TargetOs::from_host(os)?;
        let target_arch = TargetArch::from_host(arch, target_os, os)?;
        Ok(Self::new(target_os, target_arch))
    }

    /// Map a [`HostPlatform`].
    ///
    /// # Errors
    ///
    /// See [`PlatformTarget::resolve`].
    pub fn from_host(host: &HostPlatform) -> Result<Self> {
        Self::resolve(&host.os, &host.arch)
    }

    /// Executable suffix for this target (`.exe` or empty).
    #[must_use]
    pub const fn file_extension(&self) -> &'static str {
        self.os.file_extension()
    }

    /// File name of the tool binary on this target.
    #[must_use]
    pub fn binary_name(&self, tool: &str) -> String {
        format!("{tool}{}", self.file_extension())
    }

    /// Release artifact name: `{tool}-{os}-{arch}{ext}`.
    #[must_use]
    pub fn artifact_name(&self, tool: &str) -> String {
        format!("{tool}-{}-{}{}", self.os, self.arch, self.file_extension())
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
