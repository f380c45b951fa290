//! # vsphere-driver
//!
//! Lifecycle driver for docker hosts running as VMs on VMware vSphere.
//! Turns a [`MachineConfig`] into a running, SSH-reachable boot2docker guest
//! and keeps create/start/stop/remove consistent across repeated invocations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vsphere_driver::{Driver, MachineConfig, VsphereDriver};
//!
//! # async fn example() -> vsphere_driver::Result<()> {
//! let mut config = MachineConfig::new("/var/lib/machines/dev");
//! config.vcenter = "vcenter.local".into();
//! config.username = "administrator@vsphere.local".into();
//! config.password = "secret".into();
//! config.network = "VM Network".into();
//! config.datastore = "datastore1".into();
//! config.datacenter = "dc1".into();
//!
//! let mut driver = VsphereDriver::with_defaults(config);
//! driver.create().await?;
//! println!("docker host at {}", driver.url().await?);
//!
//! driver.remove().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Lifecycle Management**: Create, start, stop, restart, kill and remove
//! - **Live State**: State and IP are queried from vSphere on every call
//! - **Atomic Image Download**: Boot images never appear half-written
//! - **Pluggable Backend**: [`Backend`] and [`RemoteShell`] traits with
//!   `govc` and OpenSSH implementations
//! - **Explicit Registration**: [`DriverRegistry`] owned by the host

mod backend;
mod config;
mod driver;
mod error;
mod govc;
pub mod image;
mod registry;
mod ssh;
mod state;
mod vsphere;

pub use backend::{Backend, BackendResult, Connector, GuestLogin};
pub use config::{
    generate_machine_name, CreateOptions, MachineConfig, CONFIG_FILE_NAME, DATASTORE_DIR,
    DEFAULT_BOOT2DOCKER_URL, DEFAULT_CPU, DEFAULT_DISK_SIZE_MB, DEFAULT_MEMORY_MB,
    DEFAULT_SSH_PORT, DOCKER_PORT, ISO_FILE_NAME, SSH_KEY_FILE_NAME,
};
pub use driver::Driver;
pub use error::{BackendError, DriverError, Result};
pub use govc::{GovcBackend, GovcConnector};
pub use registry::{DriverFactory, DriverRegistry};
pub use ssh::{public_key_path, OpenSsh, RemoteShell, SshCommand};
pub use state::LifecycleState;
pub use vsphere::{register, VsphereDriver, DRIVER_NAME};
