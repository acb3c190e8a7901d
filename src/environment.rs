//! Process environment snapshot.

use serde::{Deserialize, Serialize};

/// Which tooling an environment variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvCategory {
    Path,
    Java,
    Python,
    Node,
    Other,
}

/// One environment variable at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarRecord {
    pub key: String,
    pub value: String,
    pub category: EnvCategory,
    /// Set by the operating system or login session rather than by a tool.
    pub is_system_variable: bool,
}

const SYSTEM_VARIABLES: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LOGNAME",
    "SHELL",
    "LANG",
    "TERM",
    "PWD",
    "OLDPWD",
    "TMPDIR",
    "TEMP",
    "TMP",
    "HOSTNAME",
    "DISPLAY",
    "XDG_RUNTIME_DIR",
    "XDG_SESSION_TYPE",
    "SYSTEMROOT",
    "WINDIR",
    "COMSPEC",
    "PATHEXT",
    "PROGRAMFILES",
    "PROGRAMFILES(X86)",
    "PROGRAMDATA",
    "APPDATA",
    "LOCALAPPDATA",
    "USERPROFILE",
    "USERNAME",
    "COMPUTERNAME",
    "OS",
];

/// Categorize a variable by its name.
///
/// Tool-specific names win over the generic path rule, so `PYTHONPATH`
/// is [`EnvCategory::Python`] while `LD_LIBRARY_PATH` is [`EnvCategory::Path`].
pub fn categorize(key: &str) -> EnvCategory {
    let key = key.to_ascii_uppercase();
    let has = |needles: &[&str]| needles.iter().any(|n| key.contains(n));

    if has(&["JAVA", "JDK", "JRE", "MAVEN", "GRADLE"]) || key == "CLASSPATH" {
        EnvCategory::Java
    } else if has(&["PYTHON", "PIP_", "VIRTUAL_ENV", "CONDA", "PYENV"]) {
        EnvCategory::Python
    } else if has(&["NODE", "NPM", "NVM", "YARN", "PNPM"]) {
        EnvCategory::Node
    } else if key == "PATH" || key.ends_with("PATH") {
        EnvCategory::Path
    } else {
        EnvCategory::Other
    }
}

pub fn is_system_variable(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    SYSTEM_VARIABLES.contains(&key.as_str())
}

/// Build records from `(key, value)` pairs, sorted by key.
pub fn records_from<I>(vars: I) -> Vec<EnvVarRecord>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut records: Vec<EnvVarRecord> = vars
        .into_iter()
        .map(|(key, value)| EnvVarRecord {
            category: categorize(&key),
            is_system_variable: is_system_variable(&key),
            key,
            value,
        })
        .collect();
    records.sort_by(|a, b| a.key.cmp(&b.key));
    records
}

/// Snapshot the current process environment.
///
/// Non-UTF-8 keys and values are converted lossily.
pub fn environment_variables() -> Vec<EnvVarRecord> {
    records_from(std::env::vars_os().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    }))
}

/// The entries of `PATH`, in order. Empty entries are dropped; duplicates
/// are kept.
pub fn path_entries() -> Vec<String> {
    std::env::var_os("PATH")
        .map(|raw| split_path_list(&raw))
        .unwrap_or_default()
}

fn split_path_list(raw: &std::ffi::OsStr) -> Vec<String> {
    std::env::split_paths(raw)
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.trim().is_empty())
        .collect()
}
