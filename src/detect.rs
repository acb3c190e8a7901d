//! Tool probes and the concurrent detection orchestrator.

use crate::detection::{is_shell_safe, parse_version, CommandRunner};
use crate::install_method::classify;
use crate::{DetectOptions, Probe, ToolKind, ToolRecord};
use futures::future::join_all;
use tracing::{debug, warn};

/// Run a single probe.
///
/// Each version invocation of the probe is tried in order (`python3`
/// before `python`). The first one that succeeds yields a fully populated
/// record: version parsed from its output, absolute path of the command
/// that answered, and the install method classified from that path. When
/// every invocation fails the result is a degraded record with
/// `is_installed == false`.
///
/// Never fails: a missing binary, non-zero exit or timeout is definitive
/// for this pass and reported through the record.
///
/// # Example
///
/// ```rust,no_run
/// use devscope::{probe, DetectOptions, Probe, SystemRunner, ToolKind};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let node = Probe::Known(ToolKind::Node);
///     let record = probe(&SystemRunner::new(), &node, &DetectOptions::default()).await;
///     println!("{} installed={}", record.display_name, record.is_installed);
/// }
/// ```
pub async fn probe(
    runner: &dyn CommandRunner,
    probe: &Probe,
    options: &DetectOptions,
) -> ToolRecord {
    let degraded =
        || ToolRecord::not_installed(probe.name(), probe.display_name(), probe.category());

    if let Probe::Custom(custom) = probe {
        let flag = custom.version_flag.trim_start_matches('-');
        if !is_shell_safe(&custom.command, &[]) || !is_shell_safe(flag, &['=']) {
            warn!(
                command = %custom.command,
                flag = %custom.version_flag,
                "refusing to probe unsafe command"
            );
            return degraded();
        }
    }

    for (command, invocation) in probe.attempts() {
        let outcome = runner.run(&invocation, options.timeout).await;
        if !outcome.success {
            debug!(
                tool = probe.name(),
                invocation = %invocation,
                stderr = %outcome.stderr,
                "probe attempt failed"
            );
            continue;
        }

        let parsed = parse_version(outcome.version_text());
        let path = runner.tool_path(&command).await;
        let install_method = classify(path.as_deref(), options.platform);

        return ToolRecord {
            name: probe.name().to_string(),
            display_name: probe.display_name().to_string(),
            version: parsed.version,
            path,
            is_installed: true,
            install_method,
            category: probe.category(),
        };
    }

    degraded()
}

/// Detect one tool by name.
///
/// Known identifiers use their dedicated probe; any other name is probed
/// as a generic command with `--version`.
pub async fn detect_one(
    runner: &dyn CommandRunner,
    name: &str,
    options: &DetectOptions,
) -> ToolRecord {
    probe(runner, &Probe::for_name(name), options).await
}

/// Run the given probes concurrently.
///
/// Returns exactly one record per probe, in the order the probes were
/// given, regardless of completion order. A failing probe yields a
/// degraded record and never affects the others.
pub async fn detect_probes(
    runner: &dyn CommandRunner,
    probes: &[Probe],
    options: &DetectOptions,
) -> Vec<ToolRecord> {
    // join_all yields outputs in input order, not completion order.
    let futures: Vec<_> = probes.iter().map(|p| probe(runner, p, options)).collect();
    join_all(futures).await
}

/// Detect every known tool in parallel.
///
/// Total time is roughly that of the slowest probe. Results follow
/// [`ToolKind::all`] declaration order.
///
/// # Example
///
/// ```rust,no_run
/// use devscope::{detect_all, DetectOptions, SystemRunner};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     for record in detect_all(&SystemRunner::new(), &DetectOptions::default()).await {
///         println!("{}: {:?}", record.display_name, record.version);
///     }
/// }
/// ```
pub async fn detect_all(runner: &dyn CommandRunner, options: &DetectOptions) -> Vec<ToolRecord> {
    let probes: Vec<Probe> = ToolKind::all().map(Probe::Known).collect();
    let records = detect_probes(runner, &probes, options).await;
    debug!(
        installed = records.iter().filter(|r| r.is_installed).count(),
        total = records.len(),
        "detection pass finished"
    );
    records
}
