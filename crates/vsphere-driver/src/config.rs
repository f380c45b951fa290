//! Configuration types for vSphere-hosted machines.

use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default number of virtual CPUs.
pub const DEFAULT_CPU: u32 = 2;

/// Default memory size in MB.
pub const DEFAULT_MEMORY_MB: u32 = 2048;

/// Default disk size in MB.
pub const DEFAULT_DISK_SIZE_MB: u32 = 20000;

/// SSH port the guest listens on.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Port the docker daemon listens on inside the guest.
pub const DOCKER_PORT: u16 = 2376;

/// Boot image used when no URL is configured.
///
/// Docker 1.3 boot2docker build with identity auth and vmtoolsd.
pub const DEFAULT_BOOT2DOCKER_URL: &str =
    "https://github.com/cloudnativeapps/boot2docker/releases/download/1.3.1_vmw-identity/boot2docker.iso";

/// File name of the boot image inside the machine store.
pub const ISO_FILE_NAME: &str = "boot2docker.iso";

/// Datastore directory holding uploaded boot images.
pub const DATASTORE_DIR: &str = "boot2docker-iso";

/// File name of the private SSH key inside the machine store.
pub const SSH_KEY_FILE_NAME: &str = "id_docker_host_vsphere";

/// File name of the persisted configuration inside the machine store.
pub const CONFIG_FILE_NAME: &str = "config.json";

const MACHINE_NAME_PREFIX: &str = "docker-host-";
const RANDOM_ID_LEN: usize = 12;

/// Configuration for a single vSphere-hosted machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineConfig {
    /// Machine name, unique within the caller's store
    pub machine_name: String,
    /// SSH port of the guest
    pub ssh_port: u16,
    /// Number of virtual CPUs
    pub cpu: u32,
    /// Memory size in MB
    pub memory_mb: u32,
    /// Disk size in MB
    pub disk_size_mb: u32,
    /// Boot image URL (empty = built-in default)
    pub boot2docker_url: String,
    /// vCenter IP address or hostname
    pub vcenter: String,
    /// vSphere username
    pub username: String,
    /// vSphere password
    pub password: String,
    /// Network the VM is attached to
    pub network: String,
    /// Datastore hosting the VM and boot image
    pub datastore: String,
    /// Datacenter the VM is created in
    pub datacenter: String,
    /// Resource pool (optional)
    pub pool: Option<String>,
    /// Compute host the VM is placed on (optional)
    pub host_ip: Option<String>,
    /// Local machine store directory
    pub store_path: PathBuf,
    /// Local path of the downloaded boot image
    pub iso: PathBuf,
    /// Extra public keys merged into the guest's docker authorized keys
    #[serde(default)]
    pub authorized_keys: Vec<PathBuf>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            machine_name: String::new(),
            ssh_port: DEFAULT_SSH_PORT,
            cpu: DEFAULT_CPU,
            memory_mb: DEFAULT_MEMORY_MB,
            disk_size_mb: DEFAULT_DISK_SIZE_MB,
            boot2docker_url: String::new(),
            vcenter: String::new(),
            username: String::new(),
            password: String::new(),
            network: String::new(),
            datastore: String::new(),
            datacenter: String::new(),
            pool: None,
            host_ip: None,
            store_path: PathBuf::new(),
            iso: PathBuf::new(),
            authorized_keys: Vec::new(),
        }
    }
}

/// Creation options supplied by the host, usually from command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    pub cpu: u32,
    pub memory_mb: u32,
    pub disk_size_mb: u32,
    pub boot2docker_url: String,
    pub vcenter: String,
    pub username: String,
    pub password: String,
    pub network: String,
    pub datastore: String,
    pub datacenter: String,
    pub pool: Option<String>,
    pub host_ip: Option<String>,
    pub authorized_keys: Vec<PathBuf>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_CPU,
            memory_mb: DEFAULT_MEMORY_MB,
            disk_size_mb: DEFAULT_DISK_SIZE_MB,
            boot2docker_url: String::new(),
            vcenter: String::new(),
            username: String::new(),
            password: String::new(),
            network: String::new(),
            datastore: String::new(),
            datacenter: String::new(),
            pool: None,
            host_ip: None,
            authorized_keys: Vec::new(),
        }
    }
}

impl MachineConfig {
    /// Create an empty configuration rooted at the given machine store.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        Self {
            iso: store_path.join(ISO_FILE_NAME),
            store_path,
            ..Default::default()
        }
    }

    /// Apply creation options, assigning a machine name if none is set.
    pub fn apply_options(&mut self, options: CreateOptions) {
        self.set_name_if_unset();
        self.ssh_port = DEFAULT_SSH_PORT;
        self.cpu = options.cpu;
        self.memory_mb = options.memory_mb;
        self.disk_size_mb = options.disk_size_mb;
        self.boot2docker_url = options.boot2docker_url;
        self.vcenter = options.vcenter;
        self.username = options.username;
        self.password = options.password;
        self.network = options.network;
        self.datastore = options.datastore;
        self.datacenter = options.datacenter;
        self.pool = options.pool.filter(|p| !p.is_empty());
        self.host_ip = options.host_ip.filter(|h| !h.is_empty());
        self.authorized_keys = options.authorized_keys;
        self.iso = self.store_path.join(ISO_FILE_NAME);
    }

    /// Assign a generated machine name if none is set.
    ///
    /// A name, once assigned, is never replaced.
    pub fn set_name_if_unset(&mut self) {
        if self.machine_name.is_empty() {
            self.machine_name = generate_machine_name();
        }
    }

    /// Return the first missing required field, if any.
    ///
    /// Fields are checked in a fixed order: vCenter, username, password,
    /// network, datastore, datacenter.
    pub fn missing_field(&self) -> Option<&'static str> {
        let required = [
            (&self.vcenter, "vSphere IP"),
            (&self.username, "vSphere username"),
            (&self.password, "vSphere password"),
            (&self.network, "vSphere network"),
            (&self.datastore, "vSphere datastore"),
            (&self.datacenter, "vSphere datacenter"),
        ];
        required
            .into_iter()
            .find(|(value, _)| value.is_empty())
            .map(|(_, field)| field)
    }

    /// Validate that every required field is present.
    ///
    /// # Errors
    /// Returns [`DriverError::IncompleteConfig`] naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        match self.missing_field() {
            Some(field) => Err(DriverError::IncompleteConfig(field.to_string())),
            None => Ok(()),
        }
    }

    /// Boot image URL to download: the configured one or the default.
    pub fn boot2docker_url(&self) -> &str {
        if self.boot2docker_url.is_empty() {
            DEFAULT_BOOT2DOCKER_URL
        } else {
            &self.boot2docker_url
        }
    }

    /// Path of the private SSH key.
    pub fn ssh_key_path(&self) -> PathBuf {
        self.store_path.join(SSH_KEY_FILE_NAME)
    }

    /// Path of the public SSH key.
    pub fn public_ssh_key_path(&self) -> PathBuf {
        crate::ssh::public_key_path(&self.ssh_key_path())
    }

    /// Load a configuration previously saved in the given store.
    pub async fn load(store_path: &Path) -> Result<Self> {
        let path = store_path.join(CONFIG_FILE_NAME);
        tracing::debug!(path = %path.display(), "Loading machine config");
        let data = tokio::fs::read(&path).await?;
        let mut config: MachineConfig = serde_json::from_slice(&data)?;
        // The store may have been moved since the config was written.
        config.store_path = store_path.to_path_buf();
        config.iso = store_path.join(ISO_FILE_NAME);
        Ok(config)
    }

    /// Persist this configuration into its machine store.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.store_path).await?;
        let path = self.store_path.join(CONFIG_FILE_NAME);
        let data = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), machine = %self.machine_name, "Saved machine config");
        Ok(())
    }
}

/// Generate a machine name of the form `docker-host-<random-id>`.
pub fn generate_machine_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{MACHINE_NAME_PREFIX}{}", &id[..RANDOM_ID_LEN])
}
