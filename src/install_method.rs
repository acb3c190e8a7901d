//! Installation provenance inferred from an executable's path.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a tool binary was installed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InstallMethod {
    /// No package manager marker matched.
    Manual,
    /// Homebrew / Linuxbrew.
    Homebrew,
    /// Chocolatey (Windows).
    Chocolatey,
    /// Distribution package under a system bin directory (Linux).
    Apt,
    /// npm global install.
    Npm,
    /// pip / pipx install.
    Pip,
}

/// Host platform, as far as classification is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

const HOMEBREW_MARKERS: &[&str] = &["homebrew", "linuxbrew", "/cellar/"];
const CHOCOLATEY_MARKERS: &[&str] = &["chocolatey", "/choco/"];
const SYSTEM_BIN_MARKERS: &[&str] = &["/usr/bin/", "/usr/sbin/"];
const NPM_MARKERS: &[&str] = &["node_modules", "/.npm", "npm-global", "/npm/"];
const PIP_MARKERS: &[&str] = &["site-packages", "dist-packages", "pipx"];

/// Classify how the binary at `path` was installed.
///
/// Matching is a case-insensitive substring check (backslashes are treated
/// as `/`) in this order: Homebrew, Chocolatey, system bin (Linux only),
/// npm, pip, and finally [`InstallMethod::Manual`]. Returns `None` only
/// when `path` is `None`.
pub fn classify(path: Option<&Path>, platform: Platform) -> Option<InstallMethod> {
    let normalized = path?.to_string_lossy().to_lowercase().replace('\\', "/");
    let has = |markers: &[&str]| markers.iter().any(|m| normalized.contains(m));

    let method = if has(HOMEBREW_MARKERS) {
        InstallMethod::Homebrew
    } else if has(CHOCOLATEY_MARKERS) {
        InstallMethod::Chocolatey
    } else if platform == Platform::Linux && has(SYSTEM_BIN_MARKERS) {
        InstallMethod::Apt
    } else if has(NPM_MARKERS) {
        InstallMethod::Npm
    } else if has(PIP_MARKERS) {
        InstallMethod::Pip
    } else {
        InstallMethod::Manual
    };

    Some(method)
}
