//! Known tool identifiers and the probe variants built from them.

use crate::ToolCategory;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;

/// A tool with a dedicated probe.
///
/// The declaration order is the order [`crate::detect_all`] reports in.
///
/// # Example
///
/// ```rust
/// use devscope::ToolKind;
///
/// for kind in ToolKind::all() {
///     println!("{}: {:?}", kind.display_name(), kind.version_commands());
/// }
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ToolKind {
    Node,
    Npm,
    Python,
    Pip,
    Php,
    Composer,
}

impl ToolKind {
    /// Canonical identifier, used as [`crate::ToolRecord::name`].
    pub fn id(&self) -> &'static str {
        self.into()
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Node => "Node.js",
            Self::Npm => "npm",
            Self::Python => "Python",
            Self::Pip => "pip",
            Self::Php => "PHP",
            Self::Composer => "Composer",
        }
    }

    /// Command names to try, in order. The first one whose version
    /// invocation succeeds wins.
    pub fn command_names(&self) -> &'static [&'static str] {
        match self {
            Self::Node => &["node"],
            Self::Npm => &["npm"],
            Self::Python => &["python3", "python"],
            Self::Pip => &["pip3", "pip"],
            Self::Php => &["php"],
            Self::Composer => &["composer"],
        }
    }

    /// Full version invocations, in the order they are tried.
    pub fn version_commands(&self) -> Vec<String> {
        self.command_names()
            .iter()
            .map(|cmd| format!("{cmd} --version"))
            .collect()
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            Self::Node | Self::Python | Self::Php => ToolCategory::Runtime,
            Self::Npm | Self::Pip | Self::Composer => ToolCategory::PackageManager,
        }
    }

    /// Iterator over all known tool kinds, in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// A probe for an arbitrary named command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomProbe {
    /// Command name, also used as the record's name and display name.
    pub command: String,
    /// Flag that prints the version.
    pub version_flag: String,
}

impl CustomProbe {
    /// Probe `command` with the default `--version` flag.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            version_flag: "--version".to_string(),
        }
    }

    pub fn with_flag(command: impl Into<String>, version_flag: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            version_flag: version_flag.into(),
        }
    }
}

/// One detection strategy: a known tool or a generic named command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Probe {
    Known(ToolKind),
    Custom(CustomProbe),
}

impl Probe {
    /// Resolve a tool name to its probe.
    ///
    /// Known identifiers (case-insensitive) map to their dedicated probe;
    /// anything else becomes a [`CustomProbe`] with `--version`.
    ///
    /// ```rust
    /// use devscope::{Probe, ToolKind};
    ///
    /// assert_eq!(Probe::for_name("Node"), Probe::Known(ToolKind::Node));
    /// assert!(matches!(Probe::for_name("cargo"), Probe::Custom(_)));
    /// ```
    pub fn for_name(name: &str) -> Self {
        match ToolKind::from_str(name.trim()) {
            Ok(kind) => Self::Known(kind),
            Err(_) => Self::Custom(CustomProbe::new(name.trim())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known(kind) => kind.id(),
            Self::Custom(custom) => &custom.command,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Known(kind) => kind.display_name(),
            Self::Custom(custom) => &custom.command,
        }
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            Self::Known(kind) => kind.category(),
            Self::Custom(_) => ToolCategory::Tool,
        }
    }

    /// `(command name, full invocation)` pairs to try, in order.
    pub(crate) fn attempts(&self) -> Vec<(String, String)> {
        match self {
            Self::Known(kind) => kind
                .command_names()
                .iter()
                .map(|cmd| (cmd.to_string(), format!("{cmd} --version")))
                .collect(),
            Self::Custom(custom) => vec![(
                custom.command.clone(),
                format!("{} {}", custom.command, custom.version_flag),
            )],
        }
    }
}

impl From<ToolKind> for Probe {
    fn from(kind: ToolKind) -> Self {
        Self::Known(kind)
    }
}
