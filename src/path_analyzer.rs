//! Duplicate detection over PATH entries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Analysis of one PATH entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntryAnalysis {
    pub path: String,
    pub index: usize,
    pub is_duplicate: bool,
    /// Indices of the other entries with the same normalized form. Never
    /// contains `index` itself.
    pub duplicate_indices: Vec<usize>,
}

fn normalize(path: &str) -> String {
    path.trim().to_lowercase()
}

/// Report duplicate PATH entries.
///
/// Entries are compared by their trimmed, lower-cased form. Output has the
/// same length and order as `paths`; duplicates are reported, never removed.
///
/// ```rust
/// use devscope::analyze_paths;
///
/// let analysis = analyze_paths(&["/usr/bin", "/usr/local/bin", "/usr/bin"]);
/// assert_eq!(analysis[0].duplicate_indices, vec![2]);
/// assert!(!analysis[1].is_duplicate);
/// ```
pub fn analyze_paths<S: AsRef<str>>(paths: &[S]) -> Vec<PathEntryAnalysis> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        groups.entry(normalize(path.as_ref())).or_default().push(index);
    }

    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let path = path.as_ref();
            let group = groups
                .get(&normalize(path))
                .map(Vec::as_slice)
                .unwrap_or_default();
            PathEntryAnalysis {
                path: path.to_string(),
                index,
                is_duplicate: group.len() > 1,
                duplicate_indices: group.iter().copied().filter(|&i| i != index).collect(),
            }
        })
        .collect()
}
