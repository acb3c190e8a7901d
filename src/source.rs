//! The pull-based data contract between the engine and its consumers.

use crate::detection::{CommandRunner, SystemRunner};
use crate::{
    detect, environment, packages, services, EnvVarRecord, InventoryError, InventoryOptions,
    PackageManager, PackageRecord, ServiceRecord, ToolRecord,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything the domain store fetches from.
///
/// Fetches return `Err` only for domain-level failures. Actions report
/// success as a `bool` and never fail outward.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Probe every known tool. Probe failures are degraded records, not errors.
    async fn detect_all_tools(&self) -> Result<Vec<ToolRecord>, InventoryError>;

    async fn detect_one(&self, name: &str) -> ToolRecord;

    async fn list_packages(
        &self,
        manager: PackageManager,
    ) -> Result<Vec<PackageRecord>, InventoryError>;

    async fn uninstall_package(&self, name: &str, manager: PackageManager) -> bool;

    async fn list_services(&self) -> Result<Vec<ServiceRecord>, InventoryError>;

    async fn kill_service(&self, pid: u32) -> bool;

    async fn environment_variables(&self) -> Result<Vec<EnvVarRecord>, InventoryError>;

    async fn path_entries(&self) -> Result<Vec<String>, InventoryError>;
}

/// [`InventorySource`] backed by real commands on the host.
#[derive(Clone)]
pub struct SystemInventory {
    runner: Arc<dyn CommandRunner>,
    options: InventoryOptions,
}

impl SystemInventory {
    /// Use the host shell with the given options.
    pub fn new(options: InventoryOptions) -> Self {
        Self::with_runner(Arc::new(SystemRunner::new()), options)
    }

    /// Use a custom command runner.
    pub fn with_runner(runner: Arc<dyn CommandRunner>, options: InventoryOptions) -> Self {
        Self { runner, options }
    }

    pub fn options(&self) -> &InventoryOptions {
        &self.options
    }
}

impl Default for SystemInventory {
    fn default() -> Self {
        Self::new(InventoryOptions::default())
    }
}

#[async_trait]
impl InventorySource for SystemInventory {
    async fn detect_all_tools(&self) -> Result<Vec<ToolRecord>, InventoryError> {
        Ok(detect::detect_all(self.runner.as_ref(), &self.options.detect).await)
    }

    async fn detect_one(&self, name: &str) -> ToolRecord {
        detect::detect_one(self.runner.as_ref(), name, &self.options.detect).await
    }

    async fn list_packages(
        &self,
        manager: PackageManager,
    ) -> Result<Vec<PackageRecord>, InventoryError> {
        packages::list_packages(self.runner.as_ref(), manager, self.options.list_timeout).await
    }

    async fn uninstall_package(&self, name: &str, manager: PackageManager) -> bool {
        packages::uninstall_package(self.runner.as_ref(), name, manager, self.options.action_timeout)
            .await
    }

    async fn list_services(&self) -> Result<Vec<ServiceRecord>, InventoryError> {
        services::list_services(self.runner.as_ref(), self.options.list_timeout).await
    }

    async fn kill_service(&self, pid: u32) -> bool {
        services::kill_service(self.runner.as_ref(), pid, self.options.action_timeout).await
    }

    async fn environment_variables(&self) -> Result<Vec<EnvVarRecord>, InventoryError> {
        Ok(environment::environment_variables())
    }

    async fn path_entries(&self) -> Result<Vec<String>, InventoryError> {
        Ok(environment::path_entries())
    }
}
