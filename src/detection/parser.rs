//! Version output parsing with regex extraction.

use regex::Regex;
use semver::Version;
use serde::Serialize;
use std::sync::OnceLock;

/// A version token extracted from free-form command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedVersion {
    /// The extracted version (without a leading `v`), if any.
    pub version: Option<String>,
    /// The text the version was extracted from.
    pub raw: String,
}

impl ParsedVersion {
    /// Normalize the extracted version into a [`semver::Version`].
    ///
    /// Two-component versions are padded with `.0` (`3.11` -> `3.11.0`).
    pub fn semver(&self) -> Option<Version> {
        let version = self.version.as_deref()?;
        let (core, pre) = match version.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (version, None),
        };
        let padded = if core.matches('.').count() == 1 {
            format!("{core}.0")
        } else {
            core.to_string()
        };
        let full = match pre {
            Some(pre) => format!("{padded}-{pre}"),
            None => padded,
        };
        Version::parse(&full).ok()
    }
}

// Optional `v`, 2 or 3 numeric components, optional pre-release tag. The
// token must not be glued to a preceding word character or dot.
fn tagged_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\w.])v?(\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z]+(?:\.[0-9A-Za-z]+)*)?)")
            .expect("Invalid regex pattern")
    })
}

// Same token shape without the boundary guard.
fn bare_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+\.\d+(?:\.\d+)?(?:-[0-9A-Za-z]+(?:\.[0-9A-Za-z]+)*)?")
            .expect("Invalid regex pattern")
    })
}

/// Extract a version token from CLI output.
///
/// Tried in order:
///
/// 1. a standalone token with an optional leading `v`, 2 or 3 dotted
///    numeric components and an optional pre-release suffix
///    (`v18.17.0`, `Python 3.11.4`, `v1.0.0-alpha.1`)
/// 2. the first bare dotted numeric token anywhere, pre-release suffix
///    included (`build1.2.3` -> `1.2.3`, `abc1.2.3-beta` -> `1.2.3-beta`)
///
/// Returns `version: None` when neither matches. Pure and deterministic.
pub fn parse_version(raw: &str) -> ParsedVersion {
    let version = tagged_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .or_else(|| bare_pattern().find(raw))
        .map(|m| m.as_str().to_string());

    ParsedVersion {
        version,
        raw: raw.to_string(),
    }
}
