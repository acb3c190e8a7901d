//! The domain store: four independently loadable domains.
//!
//! Tools, packages, services and environment each keep their own data,
//! `loading` flag and `error`. A failing load only touches its own domain
//! and leaves the previous data in place. [`DomainStore::refresh_all`]
//! loads all four concurrently and returns once every one has settled.
//!
//! # Known race
//!
//! Concurrent loads of the *same* domain are not deduplicated; whichever
//! finishes last wins.
//!
//! A confirmed kill is the exception: a services load that was already
//! running when the kill succeeded drops the killed pid from its result, so
//! a killed process never reappears from a stale snapshot.

use crate::{
    analyze_paths, EnvVarRecord, InventoryError, InventorySource, PackageManager, PackageRecord,
    PathEntryAnalysis, ServiceRecord, ToolRecord,
};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Load state of one domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainState<T> {
    pub data: T,
    pub loading: bool,
    /// Message of the last failed load; cleared when a load starts.
    pub error: Option<String>,
}

/// Global packages, one list per manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageLists(BTreeMap<PackageManager, Vec<PackageRecord>>);

impl PackageLists {
    /// Packages of `manager`; empty if never loaded.
    pub fn get(&self, manager: PackageManager) -> &[PackageRecord] {
        self.0.get(&manager).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackageManager, &[PackageRecord])> {
        self.0.iter().map(|(m, p)| (*m, p.as_slice()))
    }

    fn set(&mut self, manager: PackageManager, packages: Vec<PackageRecord>) {
        self.0.insert(manager, packages);
    }

    fn remove(&mut self, manager: PackageManager, name: &str) {
        if let Some(list) = self.0.get_mut(&manager) {
            list.retain(|p| p.name != name);
        }
    }
}

/// The environment domain's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub variables: Vec<EnvVarRecord>,
    pub path_entries: Vec<String>,
    pub path_analysis: Vec<PathEntryAnalysis>,
}

/// Aggregation point for everything the engine knows.
///
/// Create one per application and share it behind an `Arc`.
///
/// # Example
///
/// ```rust,no_run
/// use devscope::{DomainStore, SystemInventory};
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = DomainStore::new(Arc::new(SystemInventory::default()));
///     store.refresh_all().await;
///     for tool in store.tools().data {
///         println!("{}: {:?}", tool.display_name, tool.version);
///     }
/// }
/// ```
pub struct DomainStore {
    source: Arc<dyn InventorySource>,
    tools: RwLock<DomainState<Vec<ToolRecord>>>,
    packages: RwLock<DomainState<PackageLists>>,
    services: RwLock<DomainState<Vec<ServiceRecord>>>,
    environment: RwLock<DomainState<EnvironmentSnapshot>>,
    services_tx: watch::Sender<Vec<ServiceRecord>>,
    kills: Mutex<KillLog>,
}

/// Kills confirmed while at least one services load is in flight.
///
/// Lock order: `services` before `kills`.
#[derive(Debug, Default)]
struct KillLog {
    epoch: u64,
    in_flight: usize,
    killed: Vec<(u64, u32)>,
}

impl KillLog {
    fn record(&mut self, pid: u32) {
        if self.in_flight == 0 {
            return;
        }
        self.epoch += 1;
        self.killed.push((self.epoch, pid));
    }

    fn killed_after(&self, epoch: u64, pid: u32) -> bool {
        self.killed.iter().any(|&(e, p)| e > epoch && p == pid)
    }
}

/// Marks a services load as in flight until dropped.
struct ServicesLoad<'a> {
    kills: &'a Mutex<KillLog>,
    started: u64,
}

impl<'a> ServicesLoad<'a> {
    fn begin(kills: &'a Mutex<KillLog>) -> Self {
        let mut log = lock(kills);
        log.in_flight += 1;
        Self {
            kills,
            started: log.epoch,
        }
    }
}

impl Drop for ServicesLoad<'_> {
    fn drop(&mut self) {
        let mut log = lock(self.kills);
        log.in_flight = log.in_flight.saturating_sub(1);
        if log.in_flight == 0 {
            log.killed.clear();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn begin<T>(lock: &RwLock<DomainState<T>>) {
    let mut state = write(lock);
    state.loading = true;
    state.error = None;
}

fn fail<T>(lock: &RwLock<DomainState<T>>, domain: &str, message: String) {
    warn!(domain, error = %message, "domain load failed");
    let mut state = write(lock);
    state.loading = false;
    state.error = Some(message);
}

/// Await a fetch, turning a panic inside it into an error for its domain.
async fn guarded<T, F>(fetch: F) -> Result<T, InventoryError>
where
    F: Future<Output = Result<T, InventoryError>>,
{
    match AssertUnwindSafe(fetch).catch_unwind().await {
        Ok(result) => result,
        Err(_) => Err(InventoryError::Source("fetch panicked".to_string())),
    }
}

impl DomainStore {
    pub fn new(source: Arc<dyn InventorySource>) -> Self {
        let (services_tx, _) = watch::channel(Vec::new());
        Self {
            source,
            tools: RwLock::default(),
            packages: RwLock::default(),
            services: RwLock::default(),
            environment: RwLock::default(),
            services_tx,
            kills: Mutex::default(),
        }
    }

    pub fn tools(&self) -> DomainState<Vec<ToolRecord>> {
        read(&self.tools).clone()
    }

    pub fn packages(&self) -> DomainState<PackageLists> {
        read(&self.packages).clone()
    }

    pub fn services(&self) -> DomainState<Vec<ServiceRecord>> {
        read(&self.services).clone()
    }

    pub fn environment(&self) -> DomainState<EnvironmentSnapshot> {
        read(&self.environment).clone()
    }

    /// Whether the last tools load found `name` installed.
    pub fn is_tool_installed(&self, name: &str) -> bool {
        ToolRecord::find(&read(&self.tools).data, name).is_some_and(|t| t.is_installed)
    }

    /// Receive the service list after every successful services load and
    /// every confirmed kill.
    pub fn subscribe_services(&self) -> watch::Receiver<Vec<ServiceRecord>> {
        self.services_tx.subscribe()
    }

    /// Load all four domains concurrently and wait for all of them.
    ///
    /// A failure in one domain never cancels or alters the others.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.load_tools(),
            self.load_packages(),
            self.load_services(),
            self.load_environment(),
        );
        debug!("refresh finished");
    }

    /// Re-run every tool probe and replace the tools list.
    pub async fn load_tools(&self) {
        begin(&self.tools);
        match guarded(self.source.detect_all_tools()).await {
            Ok(tools) => {
                let mut state = write(&self.tools);
                state.data = tools;
                state.loading = false;
            }
            Err(e) => fail(&self.tools, "tools", e.to_string()),
        }
    }

    /// Probe a single tool and replace its record in the tools list
    /// (appending it if it was not listed).
    pub async fn refresh_tool(&self, name: &str) -> ToolRecord {
        let record = self.source.detect_one(name).await;
        let mut state = write(&self.tools);
        match state.data.iter().position(|t| t.name == record.name) {
            Some(index) => state.data[index] = record.clone(),
            None => state.data.push(record.clone()),
        }
        record
    }

    /// Load every package manager's list concurrently.
    ///
    /// Each manager that succeeds replaces its own list. Managers that fail
    /// keep their previous list and are named in the domain error.
    pub async fn load_packages(&self) {
        begin(&self.packages);
        let managers: Vec<PackageManager> = PackageManager::all().collect();
        let results = join_all(
            managers
                .iter()
                .map(|&m| guarded(self.source.list_packages(m))),
        )
        .await;

        let mut failures = Vec::new();
        let mut state = write(&self.packages);
        for (manager, result) in managers.into_iter().zip(results) {
            match result {
                Ok(packages) => state.data.set(manager, packages),
                Err(e) => failures.push(format!("{manager}: {e}")),
            }
        }
        state.loading = false;
        if !failures.is_empty() {
            let message = failures.join("; ");
            warn!(domain = "packages", error = %message, "domain load failed");
            state.error = Some(message);
        }
    }

    /// Load one manager's list, leaving the other managers untouched.
    pub async fn load_packages_for(&self, manager: PackageManager) {
        begin(&self.packages);
        match guarded(self.source.list_packages(manager)).await {
            Ok(packages) => {
                let mut state = write(&self.packages);
                state.data.set(manager, packages);
                state.loading = false;
            }
            Err(e) => fail(&self.packages, "packages", format!("{manager}: {e}")),
        }
    }

    /// Fetch the running services and publish them to subscribers.
    ///
    /// Pids killed through [`kill_service`](Self::kill_service) while the
    /// fetch was running are left out of the result.
    pub async fn load_services(&self) {
        begin(&self.services);
        let load = ServicesLoad::begin(&self.kills);
        match guarded(self.source.list_services()).await {
            Ok(mut services) => {
                let mut state = write(&self.services);
                {
                    let kills = lock(&self.kills);
                    services.retain(|s| !kills.killed_after(load.started, s.pid));
                }
                state.data = services.clone();
                state.loading = false;
                self.services_tx.send_replace(services);
            }
            Err(e) => fail(&self.services, "services", e.to_string()),
        }
    }

    /// Snapshot environment variables and PATH, and analyze PATH.
    pub async fn load_environment(&self) {
        begin(&self.environment);
        let (variables, path_entries) = tokio::join!(
            guarded(self.source.environment_variables()),
            guarded(self.source.path_entries()),
        );

        match variables.and_then(|v| path_entries.map(|p| (v, p))) {
            Ok((variables, path_entries)) => {
                let path_analysis = analyze_paths(&path_entries);
                let mut state = write(&self.environment);
                state.data = EnvironmentSnapshot {
                    variables,
                    path_entries,
                    path_analysis,
                };
                state.loading = false;
            }
            Err(e) => fail(&self.environment, "environment", e.to_string()),
        }
    }

    /// Kill a service. On success the record is dropped from the services
    /// list right away; on failure nothing changes.
    pub async fn kill_service(&self, pid: u32) -> bool {
        if !self.source.kill_service(pid).await {
            debug!(pid, "kill failed");
            return false;
        }
        let mut state = write(&self.services);
        lock(&self.kills).record(pid);
        state.data.retain(|s| s.pid != pid);
        self.services_tx.send_replace(state.data.clone());
        true
    }

    /// Uninstall a package. On success it is dropped from its manager's
    /// list right away; on failure nothing changes.
    pub async fn uninstall_package(&self, name: &str, manager: PackageManager) -> bool {
        if !self.source.uninstall_package(name, manager).await {
            debug!(package = name, %manager, "uninstall failed");
            return false;
        }
        write(&self.packages).data.remove(manager, name);
        true
    }
}
