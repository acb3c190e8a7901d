//! `devscope` command: prints engine results as JSON.

use clap::{Parser, Subcommand};
use devscope::{DomainStore, InventoryOptions, PackageManager, ServicePoller, SystemInventory};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devscope", version, about = "Inspect installed dev tooling and running dev processes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect every known runtime and package manager
    Tools,
    /// Detect a single tool by name
    Tool { name: String },
    /// List global packages of a package manager
    Packages {
        #[arg(value_parser = parse_manager)]
        manager: PackageManager,
    },
    /// List running development processes
    Services {
        /// Keep polling and print every update
        #[arg(long)]
        watch: bool,
    },
    /// Show environment variables
    Env,
    /// Show PATH entries with duplicate analysis
    Path,
    /// Load every domain at once
    All,
}

fn parse_manager(raw: &str) -> Result<PackageManager, String> {
    raw.parse()
        .map_err(|_| format!("unknown package manager `{raw}` (expected npm, pip or composer)"))
}

fn init_logging() {
    let filter = std::env::var("DEVSCOPE_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            eprintln!("failed to encode output: {e}");
            false
        }
    }
}

fn report<T: Serialize>(data: &T, error: Option<&str>) -> bool {
    if let Some(error) = error {
        eprintln!("error: {error}");
        return false;
    }
    print_json(data)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let options = InventoryOptions::from_env();
    let poll_interval = options.poll_interval;
    let source = Arc::new(SystemInventory::new(options));
    let store = Arc::new(DomainStore::new(source));

    let ok = match cli.command {
        Command::Tools => {
            store.load_tools().await;
            let state = store.tools();
            report(&state.data, state.error.as_deref())
        }
        Command::Tool { name } => print_json(&store.refresh_tool(&name).await),
        Command::Packages { manager } => {
            store.load_packages_for(manager).await;
            let state = store.packages();
            report(&state.data.get(manager), state.error.as_deref())
        }
        Command::Services { watch: false } => {
            store.load_services().await;
            let state = store.services();
            report(&state.data, state.error.as_deref())
        }
        Command::Services { watch: true } => {
            let mut updates = store.subscribe_services();
            let poller = ServicePoller::new(Arc::clone(&store), poll_interval);
            poller.start();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break true;
                        }
                        let services = updates.borrow_and_update().clone();
                        print_json(&services);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        poller.stop();
                        break true;
                    }
                }
            }
        }
        Command::Env => {
            store.load_environment().await;
            let state = store.environment();
            report(&state.data.variables, state.error.as_deref())
        }
        Command::Path => {
            store.load_environment().await;
            let state = store.environment();
            report(&state.data.path_analysis, state.error.as_deref())
        }
        Command::All => {
            store.refresh_all().await;
            print_json(&serde_json::json!({
                "tools": store.tools(),
                "packages": store.packages(),
                "services": store.services(),
                "environment": store.environment(),
            }))
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
