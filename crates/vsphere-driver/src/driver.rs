//! The machine lifecycle contract consumed by host processes.

use crate::error::Result;
use crate::ssh::SshCommand;
use crate::state::LifecycleState;
use async_trait::async_trait;

/// Lifecycle operations a host can drive on a single machine.
///
/// Implementations derive state from their backend on every call; nothing
/// about whether the machine is running is cached between calls. Hosts are
/// expected to serialize operations per machine.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name this driver is registered under.
    fn driver_name(&self) -> &'static str;

    /// Name of the managed machine.
    fn machine_name(&self) -> &str;

    /// Provision the machine and bring it to a running, reachable state.
    async fn create(&mut self) -> Result<()>;

    /// Start the machine. Succeeds without side effects if already running.
    async fn start(&self) -> Result<()>;

    /// Request power-off, whatever the current state.
    async fn stop(&self) -> Result<()>;

    /// Stop then start the machine.
    async fn restart(&self) -> Result<()>;

    /// Hard stop. Same as [`Driver::stop`] unless the backend distinguishes.
    async fn kill(&self) -> Result<()>;

    /// Destroy the machine, stopping it first if it is running.
    async fn remove(&self) -> Result<()>;

    /// Upgrade the machine's boot image.
    async fn upgrade(&self) -> Result<()>;

    /// Current lifecycle state, queried from the backend.
    async fn state(&self) -> Result<LifecycleState>;

    /// Guest IP address. Requires the machine to be running.
    async fn ip(&self) -> Result<String>;

    /// Docker daemon URL, or an empty string if no IP is available yet.
    async fn url(&self) -> Result<String>;

    /// Build an SSH invocation against the guest running `args`.
    async fn ssh_command(&self, args: &[String]) -> Result<SshCommand>;
}
