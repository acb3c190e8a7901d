//! Globally installed packages per package manager.

use crate::detection::{is_shell_safe, CommandOutcome, CommandRunner};
use crate::InventoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

/// A package manager whose global packages can be listed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PackageManager {
    Npm,
    Pip,
    Composer,
}

impl PackageManager {
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }

    /// Invocations that list global packages as JSON, tried in order.
    fn list_commands(&self) -> &'static [&'static str] {
        match self {
            Self::Npm => &["npm ls -g --depth=0 --json"],
            Self::Pip => &["pip3 list -v --format=json", "pip list -v --format=json"],
            Self::Composer => &["composer global show --format=json"],
        }
    }

    /// Command printing the directory packages are installed under.
    fn root_command(&self) -> Option<&'static str> {
        match self {
            Self::Npm => Some("npm root -g"),
            Self::Pip => None,
            Self::Composer => Some("composer global config vendor-dir --absolute"),
        }
    }

    fn uninstall_commands(&self, name: &str) -> Vec<String> {
        match self {
            Self::Npm => vec![format!("npm uninstall -g {name}")],
            Self::Pip => vec![
                format!("pip3 uninstall -y {name}"),
                format!("pip uninstall -y {name}"),
            ],
            Self::Composer => vec![format!("composer global remove {name}")],
        }
    }
}

/// One globally installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Install directory, empty when the manager does not report one.
    pub location: String,
    pub manager: PackageManager,
}

/// List the global packages of `manager`.
///
/// The result is a pure function of the manager's list output at the time
/// of the call.
pub async fn list_packages(
    runner: &dyn CommandRunner,
    manager: PackageManager,
    timeout: Duration,
) -> Result<Vec<PackageRecord>, InventoryError> {
    let root = async {
        match manager.root_command() {
            Some(cmd) => {
                let outcome = runner.run(cmd, timeout).await;
                outcome
                    .success
                    .then(|| outcome.stdout.lines().last().unwrap_or("").trim().to_string())
                    .filter(|root| !root.is_empty())
            }
            None => None,
        }
    };
    let (listing, root) = tokio::join!(run_first(runner, manager.list_commands(), timeout), root);
    let (command, outcome) = listing;

    // npm exits non-zero on peer dependency problems but still prints the tree
    if !outcome.success && outcome.stdout.trim().is_empty() {
        return Err(InventoryError::command_failed(command, &outcome));
    }

    let packages = match manager {
        PackageManager::Npm => parse_npm_list(&outcome.stdout, root.as_deref()),
        PackageManager::Pip => parse_pip_list(&outcome.stdout),
        PackageManager::Composer => parse_composer_show(&outcome.stdout, root.as_deref()),
    }
    .map_err(|e| InventoryError::invalid_output(command, e))?;

    debug!(%manager, count = packages.len(), "listed packages");
    Ok(packages)
}

/// Uninstall a global package. Returns `true` only on confirmed success.
pub async fn uninstall_package(
    runner: &dyn CommandRunner,
    name: &str,
    manager: PackageManager,
    timeout: Duration,
) -> bool {
    if !is_shell_safe(name, &['@', '/']) {
        warn!(package = name, %manager, "refusing to uninstall unsafe package name");
        return false;
    }

    for command in manager.uninstall_commands(name) {
        let outcome = runner.run(&command, timeout).await;
        if outcome.success {
            debug!(package = name, %manager, "uninstalled package");
            return true;
        }
        debug!(command = %command, stderr = %outcome.stderr, "uninstall attempt failed");
    }
    false
}

async fn run_first(
    runner: &dyn CommandRunner,
    commands: &[&'static str],
    timeout: Duration,
) -> (&'static str, CommandOutcome) {
    let mut last = ("", CommandOutcome::failure("no command to run"));
    for &command in commands {
        let outcome = runner.run(command, timeout).await;
        if outcome.success {
            return (command, outcome);
        }
        last = (command, outcome);
    }
    last
}

fn join_location(root: Option<&str>, name: &str) -> String {
    root.map(|r| Path::new(r).join(name).to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct NpmList {
    #[serde(default)]
    dependencies: BTreeMap<String, NpmDependency>,
}

#[derive(Deserialize)]
struct NpmDependency {
    #[serde(default)]
    version: Option<String>,
}

fn parse_npm_list(
    stdout: &str,
    root: Option<&str>,
) -> Result<Vec<PackageRecord>, serde_json::Error> {
    let list: NpmList = serde_json::from_str(stdout)?;
    Ok(list
        .dependencies
        .into_iter()
        .map(|(name, dep)| PackageRecord {
            location: join_location(root, &name),
            version: dep.version.unwrap_or_default(),
            name,
            manager: PackageManager::Npm,
        })
        .collect())
}

#[derive(Deserialize)]
struct PipEntry {
    name: String,
    version: String,
    #[serde(default)]
    location: Option<String>,
}

fn parse_pip_list(stdout: &str) -> Result<Vec<PackageRecord>, serde_json::Error> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<PipEntry> = serde_json::from_str(stdout)?;
    Ok(entries
        .into_iter()
        .map(|e| PackageRecord {
            name: e.name,
            version: e.version,
            location: e.location.unwrap_or_default(),
            manager: PackageManager::Pip,
        })
        .collect())
}

#[derive(Deserialize)]
struct ComposerShow {
    #[serde(default)]
    installed: Vec<ComposerEntry>,
}

#[derive(Deserialize)]
struct ComposerEntry {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

fn parse_composer_show(
    stdout: &str,
    vendor: Option<&str>,
) -> Result<Vec<PackageRecord>, serde_json::Error> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let show: ComposerShow = serde_json::from_str(stdout)?;
    Ok(show
        .installed
        .into_iter()
        .map(|e| PackageRecord {
            location: join_location(vendor, &e.name),
            version: e.version.unwrap_or_default(),
            name: e.name,
            manager: PackageManager::Composer,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TableRunner {
        outputs: HashMap<&'static str, CommandOutcome>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for TableRunner {
        async fn run(&self, command_line: &str, _timeout: Duration) -> CommandOutcome {
            self.calls.lock().unwrap().push(command_line.to_string());
            self.outputs
                .get(command_line)
                .cloned()
                .unwrap_or_else(|| CommandOutcome::failure("command not found"))
        }

        async fn tool_path(&self, _command: &str) -> Option<PathBuf> {
            None
        }
    }

    const NPM_JSON: &str = r#"{
        "name": "lib",
        "dependencies": {
            "typescript": { "version": "5.2.2", "overridden": false },
            "@angular/cli": { "version": "16.2.0" },
            "npm": { "version": "9.8.1" }
        }
    }"#;

    #[test]
    fn test_parse_npm_list() {
        let packages = parse_npm_list(NPM_JSON, Some("/usr/local/lib/node_modules")).unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["@angular/cli", "npm", "typescript"]);
        assert_eq!(packages[2].version, "5.2.2");
        assert_eq!(
            PathBuf::from(&packages[2].location),
            PathBuf::from("/usr/local/lib/node_modules/typescript")
        );
        assert!(packages.iter().all(|p| p.manager == PackageManager::Npm));
    }

    #[test]
    fn test_parse_npm_list_without_dependencies() {
        let packages = parse_npm_list(r#"{"name": "lib"}"#, None).unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn test_parse_pip_list() {
        let json = r#"[
            {"name": "pip", "version": "23.2.1", "location": "/usr/lib/python3/dist-packages", "installer": "pip"},
            {"name": "requests", "version": "2.31.0"}
        ]"#;
        let packages = parse_pip_list(json).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].location, "/usr/lib/python3/dist-packages");
        assert_eq!(packages[1].location, "");
        assert_eq!(packages[1].manager, PackageManager::Pip);
    }

    #[test]
    fn test_parse_composer_show() {
        let json = r#"{"installed": [
            {"name": "laravel/installer", "version": "v5.1.3", "description": "Laravel application installer."}
        ]}"#;
        let packages = parse_composer_show(json, Some("/home/u/.config/composer/vendor")).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "laravel/installer");
        assert_eq!(packages[0].version, "v5.1.3");
        assert!(packages[0].location.ends_with("installer"));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_pip_list("WARNING: not json").is_err());
        assert!(parse_composer_show("", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_npm_accepts_nonzero_exit_with_output() {
        let mut runner = TableRunner::default();
        runner.outputs.insert(
            "npm ls -g --depth=0 --json",
            CommandOutcome {
                success: false,
                stdout: NPM_JSON.to_string(),
                stderr: "npm ERR! peer dep missing".to_string(),
                exit_code: Some(1),
            },
        );
        runner
            .outputs
            .insert("npm root -g", CommandOutcome::ok("/usr/lib/node_modules"));

        let packages = list_packages(&runner, PackageManager::Npm, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(packages.len(), 3);
    }

    #[tokio::test]
    async fn test_list_pip_falls_back_to_pip() {
        let mut runner = TableRunner::default();
        runner.outputs.insert(
            "pip list -v --format=json",
            CommandOutcome::ok(r#"[{"name": "black", "version": "23.9.1"}]"#),
        );

        let packages = list_packages(&runner, PackageManager::Pip, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(packages[0].name, "black");
    }

    #[tokio::test]
    async fn test_list_missing_manager_is_error() {
        let runner = TableRunner::default();
        let result = list_packages(&runner, PackageManager::Composer, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(InventoryError::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn test_list_garbage_is_invalid_output() {
        let mut runner = TableRunner::default();
        runner
            .outputs
            .insert("composer global show --format=json", CommandOutcome::ok("oops"));
        let result = list_packages(&runner, PackageManager::Composer, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(InventoryError::InvalidOutput { .. })));
    }

    #[tokio::test]
    async fn test_uninstall_success() {
        let mut runner = TableRunner::default();
        runner
            .outputs
            .insert("npm uninstall -g @angular/cli", CommandOutcome::ok("removed 1 package"));
        assert!(
            uninstall_package(&runner, "@angular/cli", PackageManager::Npm, Duration::from_secs(1))
                .await
        );
    }

    #[tokio::test]
    async fn test_uninstall_failure_is_false() {
        let runner = TableRunner::default();
        assert!(
            !uninstall_package(&runner, "requests", PackageManager::Pip, Duration::from_secs(1))
                .await
        );
        assert_eq!(runner.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_uninstall_rejects_unsafe_name() {
        let runner = TableRunner::default();
        assert!(
            !uninstall_package(&runner, "x && reboot", PackageManager::Npm, Duration::from_secs(1))
                .await
        );
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_manager_parse_and_display() {
        assert_eq!("PIP".parse::<PackageManager>().unwrap(), PackageManager::Pip);
        assert_eq!(PackageManager::Composer.to_string(), "composer");
        assert_eq!(PackageManager::all().count(), 3);
    }
}
