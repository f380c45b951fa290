//! Backend connection traits.
//!
//! The orchestrator talks to vSphere exclusively through these traits, so a
//! recording fake can stand in for the real platform in tests.

use crate::config::MachineConfig;
use crate::error::BackendError;
use async_trait::async_trait;
use std::path::Path;

/// Result type for backend primitives.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Credentials used by the guest tools to run in-guest operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestLogin {
    /// Guest user name
    pub user: String,
    /// Guest password
    pub password: String,
}

impl GuestLogin {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

/// Primitive operations against a single VM on the virtualization platform.
///
/// Every call blocks until the backend reports a terminal result.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a directory in the configured datastore.
    ///
    /// Creating a directory that already exists must succeed.
    async fn create_directory(&self, name: &str) -> BackendResult<()>;

    /// Upload a local file into the datastore image directory.
    async fn upload_file(&self, local_path: &Path) -> BackendResult<()>;

    /// Create the VM with the given datastore image mounted.
    async fn create_vm(&self, image_path: &str) -> BackendResult<()>;

    /// Create and attach the VM's data disk.
    async fn create_disk(&self) -> BackendResult<()>;

    /// Attach the VM to the configured network.
    async fn attach_network(&self) -> BackendResult<()>;

    /// Power the VM on.
    async fn power_on(&self) -> BackendResult<()>;

    /// Power the VM off.
    async fn power_off(&self) -> BackendResult<()>;

    /// Destroy the VM.
    async fn destroy(&self) -> BackendResult<()>;

    /// Return the raw power-state text for the VM.
    async fn query_power_state(&self) -> BackendResult<String>;

    /// Wait for the guest to report an IP address and return the raw output.
    async fn fetch_guest_ip(&self) -> BackendResult<String>;

    /// Create a directory inside the guest.
    async fn guest_create_directory(&self, login: &GuestLogin, path: &str) -> BackendResult<()>;

    /// Upload a local file into the guest.
    async fn guest_upload_file(
        &self,
        login: &GuestLogin,
        local_path: &Path,
        remote_path: &str,
    ) -> BackendResult<()>;
}

/// Constructs a fresh backend connection for a machine.
///
/// The orchestrator calls this once per lifecycle operation.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &MachineConfig) -> Box<dyn Backend>;
}
