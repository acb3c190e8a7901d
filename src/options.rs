//! Detection and inventory configuration.
//!
//! [`DetectOptions`] controls individual probes; [`InventoryOptions`] adds
//! the timeouts for list/action commands and the service poll interval.
//! Both have sensible defaults, and [`InventoryOptions::from_env`] applies
//! `DEVSCOPE_*` overrides on top of them.

use crate::Platform;
use std::time::Duration;
use tracing::warn;

/// Configuration options for tool detection.
///
/// # Example
///
/// ```rust
/// use devscope::DetectOptions;
/// use std::time::Duration;
///
/// let opts = DetectOptions {
///     timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// assert_eq!(opts.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Hard timeout for each version invocation.
    ///
    /// Default: 5 seconds
    pub timeout: Duration,

    /// Platform used for install-method classification.
    ///
    /// Default: [`Platform::current`]
    pub platform: Platform,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            platform: Platform::current(),
        }
    }
}

/// Configuration for the whole inventory engine.
#[derive(Debug, Clone)]
pub struct InventoryOptions {
    pub detect: DetectOptions,

    /// Timeout for package and process listing commands.
    ///
    /// Default: 30 seconds
    pub list_timeout: Duration,

    /// Timeout for uninstall and kill commands.
    ///
    /// Default: 120 seconds
    pub action_timeout: Duration,

    /// Interval between service poll cycles.
    ///
    /// Default: 5000 ms
    pub poll_interval: Duration,
}

impl Default for InventoryOptions {
    fn default() -> Self {
        Self {
            detect: DetectOptions::default(),
            list_timeout: Duration::from_secs(30),
            action_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(5000),
        }
    }
}

impl InventoryOptions {
    /// Defaults overridden by `DEVSCOPE_PROBE_TIMEOUT_MS`,
    /// `DEVSCOPE_LIST_TIMEOUT_MS`, `DEVSCOPE_ACTION_TIMEOUT_MS` and
    /// `DEVSCOPE_POLL_INTERVAL_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        let millis = |key: &str| -> Option<Duration> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
                _ => {
                    warn!(key, value = %raw, "ignoring invalid duration override");
                    None
                }
            }
        };

        if let Some(d) = millis("DEVSCOPE_PROBE_TIMEOUT_MS") {
            opts.detect.timeout = d;
        }
        if let Some(d) = millis("DEVSCOPE_LIST_TIMEOUT_MS") {
            opts.list_timeout = d;
        }
        if let Some(d) = millis("DEVSCOPE_ACTION_TIMEOUT_MS") {
            opts.action_timeout = d;
        }
        if let Some(d) = millis("DEVSCOPE_POLL_INTERVAL_MS") {
            opts.poll_interval = d;
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_timeout() {
        let opts = DetectOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert_eq!(opts.platform, Platform::current());
    }

    #[test]
    fn test_inventory_defaults() {
        let opts = InventoryOptions::default();
        assert_eq!(opts.poll_interval, Duration::from_millis(5000));
        assert_eq!(opts.list_timeout, Duration::from_secs(30));
        assert_eq!(opts.action_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DEVSCOPE_PROBE_TIMEOUT_MS", "1500"),
            ("DEVSCOPE_POLL_INTERVAL_MS", " 250 "),
        ]
        .into_iter()
        .collect();
        let opts = InventoryOptions::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(opts.detect.timeout, Duration::from_millis(1500));
        assert_eq!(opts.poll_interval, Duration::from_millis(250));
        assert_eq!(opts.list_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let vars: HashMap<&str, &str> = [
            ("DEVSCOPE_LIST_TIMEOUT_MS", "soon"),
            ("DEVSCOPE_ACTION_TIMEOUT_MS", "0"),
        ]
        .into_iter()
        .collect();
        let opts = InventoryOptions::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(opts.list_timeout, Duration::from_secs(30));
        assert_eq!(opts.action_timeout, Duration::from_secs(120));
    }
}
