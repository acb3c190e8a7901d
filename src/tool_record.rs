//! Normalized detection results.

use crate::detection::ParsedVersion;
use crate::InstallMethod;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Broad grouping of a detected tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    Runtime,
    PackageManager,
    Tool,
    Other,
}

/// The result of probing one tool.
///
/// Records are created fresh on every detection pass and never mutated.
/// A record with `is_installed == false` is a degraded record: `version`,
/// `path` and `install_method` are all `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    /// Canonical identifier (`node`, `python`, or the custom command name).
    pub name: String,
    pub display_name: String,
    /// Extracted version token, if the output contained one.
    pub version: Option<String>,
    /// Absolute path to the binary that answered the probe.
    pub path: Option<PathBuf>,
    pub is_installed: bool,
    pub install_method: Option<InstallMethod>,
    pub category: ToolCategory,
}

impl ToolRecord {
    /// A degraded record for a tool that could not be detected.
    pub fn not_installed(
        name: impl Into<String>,
        display_name: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            version: None,
            path: None,
            is_installed: false,
            install_method: None,
            category,
        }
    }

    /// Normalized semantic version, when the record carries one.
    pub fn semver(&self) -> Option<semver::Version> {
        ParsedVersion {
            version: self.version.clone(),
            raw: String::new(),
        }
        .semver()
    }

    /// Find a record by name (case-insensitive) in a detection result.
    ///
    /// ```rust
    /// use devscope::{ToolCategory, ToolRecord};
    ///
    /// let tools = vec![ToolRecord::not_installed("npm", "npm", ToolCategory::PackageManager)];
    /// assert!(ToolRecord::find(&tools, "NPM").is_some());
    /// ```
    pub fn find<'a>(records: &'a [ToolRecord], name: &str) -> Option<&'a ToolRecord> {
        records.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }
}
