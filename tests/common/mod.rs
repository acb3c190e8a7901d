//! Scripted inventory source shared by the store and poller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use devscope::{
    EnvCategory, EnvVarRecord, InstallMethod, InventoryError, InventorySource, PackageManager,
    PackageRecord, ServiceRecord, ToolCategory, ToolRecord,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// An [`InventorySource`] whose answers are set by the test.
pub struct FakeSource {
    pub tools: Mutex<Result<Vec<ToolRecord>, InventoryError>>,
    pub packages: Mutex<HashMap<PackageManager, Result<Vec<PackageRecord>, InventoryError>>>,
    pub services: Mutex<Result<Vec<ServiceRecord>, InventoryError>>,
    pub variables: Mutex<Result<Vec<EnvVarRecord>, InventoryError>>,
    pub path: Mutex<Result<Vec<String>, InventoryError>>,
    pub panic_on_services: AtomicBool,
    /// When set, `list_services` takes its snapshot and then waits here.
    pub services_gate: Mutex<Option<Arc<Notify>>>,
    pub kill_succeeds: AtomicBool,
    pub uninstall_succeeds: AtomicBool,
    pub service_calls: AtomicUsize,
    pub kill_calls: AtomicUsize,
}

impl Default for FakeSource {
    fn default() -> Self {
        let packages = PackageManager::all().map(|m| (m, Ok(Vec::new()))).collect();
        Self {
            tools: Mutex::new(Ok(vec![tool("node", true), tool("php", false)])),
            packages: Mutex::new(packages),
            services: Mutex::new(Ok(vec![service(100, "node"), service(200, "python3")])),
            variables: Mutex::new(Ok(vec![EnvVarRecord {
                key: "PATH".into(),
                value: "/usr/bin:/usr/local/bin:/usr/bin".into(),
                category: EnvCategory::Path,
                is_system_variable: true,
            }])),
            path: Mutex::new(Ok(vec![
                "/usr/bin".into(),
                "/usr/local/bin".into(),
                "/usr/bin".into(),
            ])),
            panic_on_services: AtomicBool::new(false),
            services_gate: Mutex::new(None),
            kill_succeeds: AtomicBool::new(true),
            uninstall_succeeds: AtomicBool::new(true),
            service_calls: AtomicUsize::new(0),
            kill_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeSource {
    pub fn set_services(&self, result: Result<Vec<ServiceRecord>, InventoryError>) {
        *self.services.lock().unwrap() = result;
    }

    pub fn set_packages(
        &self,
        manager: PackageManager,
        result: Result<Vec<PackageRecord>, InventoryError>,
    ) {
        self.packages.lock().unwrap().insert(manager, result);
    }

    /// Make every following `list_services` call wait for `gate` after
    /// taking its snapshot.
    pub fn hold_services(&self, gate: Arc<Notify>) {
        *self.services_gate.lock().unwrap() = Some(gate);
    }

    pub fn service_calls(&self) -> usize {
        self.service_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventorySource for FakeSource {
    async fn detect_all_tools(&self) -> Result<Vec<ToolRecord>, InventoryError> {
        self.tools.lock().unwrap().clone()
    }

    async fn detect_one(&self, name: &str) -> ToolRecord {
        tool(name, true)
    }

    async fn list_packages(
        &self,
        manager: PackageManager,
    ) -> Result<Vec<PackageRecord>, InventoryError> {
        self.packages
            .lock()
            .unwrap()
            .get(&manager)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn uninstall_package(&self, _name: &str, _manager: PackageManager) -> bool {
        self.uninstall_succeeds.load(Ordering::SeqCst)
    }

    async fn list_services(&self) -> Result<Vec<ServiceRecord>, InventoryError> {
        self.service_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_services.load(Ordering::SeqCst) {
            panic!("process table unreadable");
        }
        let snapshot = self.services.lock().unwrap().clone();
        let gate = self.services_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        snapshot
    }

    async fn kill_service(&self, _pid: u32) -> bool {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        self.kill_succeeds.load(Ordering::SeqCst)
    }

    async fn environment_variables(&self) -> Result<Vec<EnvVarRecord>, InventoryError> {
        self.variables.lock().unwrap().clone()
    }

    async fn path_entries(&self) -> Result<Vec<String>, InventoryError> {
        self.path.lock().unwrap().clone()
    }
}

pub fn tool(name: &str, installed: bool) -> ToolRecord {
    if !installed {
        return ToolRecord::not_installed(name, name, ToolCategory::Tool);
    }
    ToolRecord {
        name: name.into(),
        display_name: name.into(),
        version: Some("1.0.0".into()),
        path: Some(PathBuf::from(format!("/usr/local/bin/{name}"))),
        is_installed: true,
        install_method: Some(InstallMethod::Manual),
        category: ToolCategory::Tool,
    }
}

pub fn service(pid: u32, name: &str) -> ServiceRecord {
    ServiceRecord {
        pid,
        name: name.into(),
        port: None,
        command: name.into(),
        cpu: Some(0.5),
        memory: Some(1.0),
    }
}

pub fn package(name: &str, manager: PackageManager) -> PackageRecord {
    PackageRecord {
        name: name.into(),
        version: "1.0.0".into(),
        location: String::new(),
        manager,
    }
}
