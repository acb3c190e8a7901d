//! PATH-based executable lookup with fallback locations.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// System fallback paths to check if executable not found in PATH.
#[cfg(not(windows))]
const FALLBACK_PATHS: &[&str] = &["/usr/local/bin", "/usr/bin", "/opt/homebrew/bin"];
#[cfg(windows)]
const FALLBACK_PATHS: &[&str] = &[r"C:\ProgramData\chocolatey\bin"];

/// Find an executable by name.
///
/// This first tries the system PATH via the `which` crate, then common
/// locations that GUI-launched processes often miss (system directories,
/// Homebrew, and user-local bin directories).
///
/// # Returns
///
/// `Some(PathBuf)` if the executable is found, `None` otherwise.
pub(crate) fn find_executable(name: &str) -> Option<PathBuf> {
    if let Ok(path) = which::which(name) {
        return Some(path);
    }

    find_executable_in(name, fallback_dirs())
}

/// Look up `name` only in the given directories.
pub(crate) fn find_executable_in<I, P>(name: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let search: Vec<PathBuf> = dirs
        .into_iter()
        .map(|d| d.as_ref().to_path_buf())
        .filter(|d| d.is_dir())
        .collect();
    if search.is_empty() {
        return None;
    }

    let joined: OsString = std::env::join_paths(&search).ok()?;
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, Some(joined), cwd).ok()
}

fn fallback_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = FALLBACK_PATHS.iter().map(PathBuf::from).collect();

    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".local").join("bin"));
        dirs.push(home.join("bin"));
        dirs.push(home.join(".npm-global").join("bin"));
    }

    dirs
}
