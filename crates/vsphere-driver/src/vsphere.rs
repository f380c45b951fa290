//! VsphereDriver - provisions and manages a docker host VM on vSphere.

use crate::backend::{Backend, Connector, GuestLogin};
use crate::config::{MachineConfig, DATASTORE_DIR, DOCKER_PORT, ISO_FILE_NAME};
use crate::driver::Driver;
use crate::error::{DriverError, Result};
use crate::govc::GovcConnector;
use crate::image;
use crate::registry::DriverRegistry;
use crate::ssh::{shell_quote, OpenSsh, RemoteShell, SshCommand};
use crate::state::LifecycleState;
use async_trait::async_trait;
use std::sync::Arc;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "vsphere";

/// Guest account used for SSH and guest tools operations.
const GUEST_USER: &str = "docker";
const GUEST_PASSWORD: &str = "tcuser";

const GUEST_SSH_DIR: &str = "/home/docker/.ssh";
const GUEST_AUTHORIZED_KEYS: &str = "/home/docker/.ssh/authorized_keys";
const DOCKER_AUTHORIZED_KEYS_DIR: &str = "/root/.docker/authorized-keys.d";
const DOCKER_RESTART_COMMAND: &str = "sudo /etc/init.d/docker restart";

/// Lifecycle driver for a single docker host VM on vSphere.
///
/// Every operation opens a fresh backend connection through its
/// [`Connector`]; the machine state is never cached.
pub struct VsphereDriver {
    config: MachineConfig,
    connector: Arc<dyn Connector>,
    shell: Arc<dyn RemoteShell>,
}

impl VsphereDriver {
    /// Create a driver for the given machine.
    pub fn new(
        config: MachineConfig,
        connector: Arc<dyn Connector>,
        shell: Arc<dyn RemoteShell>,
    ) -> Self {
        Self {
            config,
            connector,
            shell,
        }
    }

    /// Create a driver that talks to vSphere through `govc` and to the
    /// guest through the system OpenSSH client.
    pub fn with_defaults(config: MachineConfig) -> Self {
        Self::new(config, Arc::new(GovcConnector::default()), Arc::new(OpenSsh))
    }

    /// Get the machine configuration.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    fn connect(&self) -> Box<dyn Backend> {
        self.connector.connect(&self.config)
    }

    /// Merge externally supplied public keys into the docker daemon's
    /// authorized keys directory inside the guest.
    async fn add_authorized_keys(&self) -> Result<()> {
        if self.config.authorized_keys.is_empty() {
            return Ok(());
        }

        let mut script = format!("sudo mkdir -p {DOCKER_AUTHORIZED_KEYS_DIR}");
        for path in &self.config.authorized_keys {
            let key = tokio::fs::read_to_string(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "key.pub".to_string());
            let target = format!("{DOCKER_AUTHORIZED_KEYS_DIR}/{file_name}");
            // One file per key, rewritten on every start.
            script.push_str(&format!(
                " && printf '%s\\n' {} | sudo tee {} > /dev/null",
                shell_quote(key.trim()),
                shell_quote(&target)
            ));
            tracing::debug!(machine = %self.config.machine_name, key = %path.display(), "Adding authorized key");
        }

        let command = self.ssh_command(&[script]).await?;
        self.shell.run(&command).await
    }
}

#[async_trait]
impl Driver for VsphereDriver {
    fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn machine_name(&self) -> &str {
        &self.config.machine_name
    }

    /// Provision the machine.
    ///
    /// This will:
    /// 1. Validate the configuration
    /// 2. Download the boot2docker ISO into the machine store
    /// 3. Generate an SSH key pair
    /// 4. Upload the ISO into the datastore
    /// 5. Create the VM, then its disk and network attachment
    /// 6. Start the VM
    ///
    /// Nothing remote is touched before the download succeeds. Steps that
    /// already completed are not rolled back if a later step fails.
    async fn create(&mut self) -> Result<()> {
        self.config.set_name_if_unset();
        self.config.validate()?;

        let start = std::time::Instant::now();
        let name = self.config.machine_name.clone();
        tracing::info!(machine = %name, "Creating machine");

        // Boot image
        let url = self.config.boot2docker_url().to_string();
        tracing::info!(machine = %name, %url, "Downloading boot2docker");
        let iso = image::fetch(&self.config.store_path, ISO_FILE_NAME, &url).await?;
        self.config.iso = iso.clone();

        // SSH identity
        tracing::info!(machine = %name, "Generating SSH key pair");
        self.shell
            .generate_key_pair(&self.config.ssh_key_path())
            .await?;

        // Datastore upload
        let backend = self.connect();
        tracing::info!(machine = %name, "Uploading boot2docker ISO");
        backend.create_directory(DATASTORE_DIR).await?;

        if !matches!(tokio::fs::try_exists(&iso).await, Ok(true)) {
            tracing::error!(machine = %name, iso = %iso.display(), "Unable to find boot2docker ISO");
            return Err(DriverError::IncompleteConfig(iso.display().to_string()));
        }
        backend.upload_file(&iso).await?;

        // Virtual machine
        backend
            .create_vm(&format!("{DATASTORE_DIR}/{ISO_FILE_NAME}"))
            .await?;

        tracing::info!(machine = %name, "Configuring the virtual machine");
        backend.create_disk().await?;
        backend.attach_network().await?;

        self.start().await?;

        tracing::info!(
            machine = %name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Machine created"
        );
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let name = &self.config.machine_name;
        match self.state().await? {
            LifecycleState::Running => {
                tracing::info!(machine = %name, "VM has already been started");
                Ok(())
            }
            LifecycleState::Stopped => {
                let backend = self.connect();
                tracing::info!(machine = %name, "Powering on VM");
                backend.power_on().await?;

                // Blocks until the guest reports an IP, which also means the
                // guest tools are ready for the operations below.
                backend.fetch_guest_ip().await?;

                // Guest SSH access
                tracing::info!(machine = %name, "Configuring virtual machine");
                let login = GuestLogin::new(GUEST_USER, GUEST_PASSWORD);
                backend.guest_create_directory(&login, GUEST_SSH_DIR).await?;
                backend
                    .guest_upload_file(
                        &login,
                        &self.config.public_ssh_key_path(),
                        GUEST_AUTHORIZED_KEYS,
                    )
                    .await?;

                // Docker daemon keys
                self.add_authorized_keys().await?;

                tracing::debug!(machine = %name, "Restarting docker");
                let restart = self
                    .ssh_command(&[DOCKER_RESTART_COMMAND.to_string()])
                    .await?;
                self.shell.run(&restart).await?;

                tracing::info!(machine = %name, "VM started");
                Ok(())
            }
            LifecycleState::None => {
                tracing::warn!(machine = %name, "Cannot start VM in unknown state");
                Err(DriverError::InvalidState(name.clone()))
            }
        }
    }

    async fn stop(&self) -> Result<()> {
        tracing::info!(machine = %self.config.machine_name, "Stopping VM");
        self.connect().power_off().await?;
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    async fn kill(&self) -> Result<()> {
        self.stop().await
    }

    /// Destroy the VM.
    ///
    /// A state query failure aborts before anything is destroyed. The local
    /// key pair and ISO are left in the machine store.
    async fn remove(&self) -> Result<()> {
        let name = &self.config.machine_name;
        if self.state().await? == LifecycleState::Running {
            self.stop()
                .await
                .map_err(|e| DriverError::StopBeforeRemove(Box::new(e)))?;
        }

        tracing::info!(machine = %name, "Destroying VM");
        self.connect().destroy().await?;
        Ok(())
    }

    async fn upgrade(&self) -> Result<()> {
        Err(DriverError::Unsupported(
            "upgrade is not supported for vsphere driver at this moment".into(),
        ))
    }

    async fn state(&self) -> Result<LifecycleState> {
        let raw = self.connect().query_power_state().await?;
        let state = LifecycleState::from_power_state(&raw);
        tracing::trace!(machine = %self.config.machine_name, %state, "Queried VM state");
        Ok(state)
    }

    async fn ip(&self) -> Result<String> {
        if self.state().await? != LifecycleState::Running {
            return Err(DriverError::InvalidState(self.config.machine_name.clone()));
        }
        let raw = self.connect().fetch_guest_ip().await?;
        Ok(normalize_ip(&raw))
    }

    /// Docker daemon URL.
    ///
    /// Any failure to obtain an IP yields an empty string rather than an
    /// error, so hosts can poll until the guest has an address.
    async fn url(&self) -> Result<String> {
        match self.ip().await {
            Ok(ip) if !ip.is_empty() => Ok(format!("tcp://{ip}:{DOCKER_PORT}")),
            Ok(_) => Ok(String::new()),
            Err(e) => {
                tracing::debug!(machine = %self.config.machine_name, error = %e, "No IP for URL");
                Ok(String::new())
            }
        }
    }

    async fn ssh_command(&self, args: &[String]) -> Result<SshCommand> {
        let host = self.ip().await?;
        Ok(SshCommand {
            host,
            port: self.config.ssh_port,
            user: GUEST_USER.to_string(),
            key_path: self.config.ssh_key_path(),
            args: args.to_vec(),
        })
    }
}

/// Register the vSphere driver, building each instance on the given
/// backend connector and remote shell.
pub fn register(
    registry: &mut DriverRegistry,
    connector: Arc<dyn Connector>,
    shell: Arc<dyn RemoteShell>,
) {
    registry.register(DRIVER_NAME, move |config| {
        let driver = VsphereDriver::new(config, connector.clone(), shell.clone());
        Ok(Box::new(driver) as Box<dyn Driver>)
    });
}

/// Reduce raw IP output to its first line, trimmed.
fn normalize_ip(raw: &str) -> String {
    raw.lines().next().unwrap_or_default().trim().to_string()
}
