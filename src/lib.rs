//! # devscope
//!
//! Detection and orchestration engine answering "what development tooling
//! is installed on this machine, and what is running right now?".
//!
//! This crate probes runtimes and package managers by invoking their CLIs,
//! lists global packages and running development processes, snapshots the
//! environment, and keeps all of it in a [`DomainStore`] that a UI can pull
//! from.
//!
//! ## Features
//!
//! - `CommandRunner` trait with a bounded-timeout [`SystemRunner`]
//! - [`parse_version`] and [`classify`] for version and provenance
//! - [`detect_all`] / [`detect_one`] running probes concurrently with
//!   declaration order preserved
//! - [`analyze_paths`] reporting duplicate PATH entries
//! - [`DomainStore`] with four isolated domains and [`ServicePoller`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use devscope::{detect_all, DetectOptions, SystemRunner};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let tools = detect_all(&SystemRunner::new(), &DetectOptions::default()).await;
//!     for tool in tools {
//!         println!("{}: installed={} version={:?}", tool.display_name, tool.is_installed, tool.version);
//!     }
//! }
//! ```

mod detect;
mod detection;
mod environment;
mod error;
mod install_method;
mod options;
mod packages;
mod path_analyzer;
mod poller;
mod services;
mod source;
mod store;
mod tool_kind;
mod tool_record;

pub use detect::{detect_all, detect_one, detect_probes, probe};
pub use detection::{parse_version, CommandOutcome, CommandRunner, ParsedVersion, SystemRunner};
pub use environment::{
    categorize, environment_variables, is_system_variable, path_entries, records_from,
    EnvCategory, EnvVarRecord,
};
pub use error::InventoryError;
pub use install_method::{classify, InstallMethod, Platform};
pub use options::{DetectOptions, InventoryOptions};
pub use packages::{list_packages, uninstall_package, PackageManager, PackageRecord};
pub use path_analyzer::{analyze_paths, PathEntryAnalysis};
pub use poller::{PollerState, ServicePoller};
pub use services::{kill_service, list_services, ServiceRecord};
pub use source::{InventorySource, SystemInventory};
pub use store::{DomainState, DomainStore, EnvironmentSnapshot, PackageLists};
pub use tool_kind::{CustomProbe, Probe, ToolKind};
pub use tool_record::{ToolCategory, ToolRecord};
