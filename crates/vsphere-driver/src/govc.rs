//! Backend connection that drives vSphere through the `govc` CLI.
//!
//! Connection settings are passed through govc's `GOVC_*` environment
//! variables so credentials never appear on a command line.

use crate::backend::{Backend, BackendResult, Connector, GuestLogin};
use crate::config::{MachineConfig, DATASTORE_DIR};
use crate::error::BackendError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Creates [`GovcBackend`] connections.
#[derive(Debug, Clone)]
pub struct GovcConnector {
    binary: PathBuf,
}

impl GovcConnector {
    /// Use the govc binary at `binary`.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for GovcConnector {
    fn default() -> Self {
        Self::new("govc")
    }
}

impl Connector for GovcConnector {
    fn connect(&self, config: &MachineConfig) -> Box<dyn Backend> {
        Box::new(GovcBackend::new(self.binary.clone(), config.clone()))
    }
}

/// A connection to the VM named by the machine configuration.
#[derive(Debug, Clone)]
pub struct GovcBackend {
    binary: PathBuf,
    config: MachineConfig,
}

impl GovcBackend {
    pub fn new(binary: impl Into<PathBuf>, config: MachineConfig) -> Self {
        Self {
            binary: binary.into(),
            config,
        }
    }

    /// Environment passed to every govc invocation.
    fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("GOVC_URL", self.config.vcenter.clone()),
            ("GOVC_USERNAME", self.config.username.clone()),
            ("GOVC_PASSWORD", self.config.password.clone()),
            ("GOVC_INSECURE", "1".to_string()),
            ("GOVC_DATACENTER", self.config.datacenter.clone()),
            ("GOVC_DATASTORE", self.config.datastore.clone()),
        ];
        if let Some(pool) = &self.config.pool {
            env.push(("GOVC_RESOURCE_POOL", pool.clone()));
        }
        if let Some(host) = &self.config.host_ip {
            env.push(("GOVC_HOST", host.clone()));
        }
        env
    }

    fn vm_name(&self) -> &str {
        &self.config.machine_name
    }

    fn create_vm_args(&self, image_path: &str) -> Vec<String> {
        vec![
            "vm.create".into(),
            "-on=false".into(),
            format!("-c={}", self.config.cpu),
            format!("-m={}", self.config.memory_mb),
            format!("-iso={image_path}"),
            format!("-net={}", self.config.network),
            self.vm_name().into(),
        ]
    }

    fn create_disk_args(&self) -> Vec<String> {
        let name = self.vm_name();
        vec![
            "vm.disk.create".into(),
            format!("-vm={name}"),
            format!("-name={name}/{name}"),
            format!("-size={}M", self.config.disk_size_mb),
        ]
    }

    fn guest_args(&self, command: &str, login: &GuestLogin) -> Vec<String> {
        vec![
            command.into(),
            format!("-vm={}", self.vm_name()),
            format!("-l={}:{}", login.user, login.password),
        ]
    }

    /// Run govc and return its stdout.
    async fn run(&self, operation: &str, args: Vec<String>) -> BackendResult<String> {
        tracing::debug!(operation, args = ?args, "Running govc");

        let output = Command::new(&self.binary)
            .args(&args)
            .envs(self.env())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| BackendError::new(operation, format!("failed to run govc: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("govc exited with {}", output.status),
                msg => msg.to_string(),
            };
            tracing::error!(operation, status = %output.status, "govc failed");
            return Err(BackendError::new(operation, message));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Backend for GovcBackend {
    async fn create_directory(&self, name: &str) -> BackendResult<()> {
        // -p makes an existing directory a success.
        let args = vec!["datastore.mkdir".into(), "-p".into(), name.into()];
        self.run("create datastore directory", args).await?;
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path) -> BackendResult<()> {
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BackendError::new(
                    "upload file",
                    format!("{} has no file name", local_path.display()),
                )
            })?;
        let args = vec![
            "datastore.upload".into(),
            local_path.to_string_lossy().into_owned(),
            format!("{DATASTORE_DIR}/{file_name}"),
        ];
        self.run("upload file", args).await?;
        Ok(())
    }

    async fn create_vm(&self, image_path: &str) -> BackendResult<()> {
        self.run("create VM", self.create_vm_args(image_path)).await?;
        Ok(())
    }

    async fn create_disk(&self) -> BackendResult<()> {
        self.run("create disk", self.create_disk_args()).await?;
        Ok(())
    }

    async fn attach_network(&self) -> BackendResult<()> {
        let args = vec![
            "vm.network.change".into(),
            format!("-vm={}", self.vm_name()),
            format!("-net={}", self.config.network),
            "ethernet-0".into(),
        ];
        self.run("attach network", args).await?;
        Ok(())
    }

    async fn power_on(&self) -> BackendResult<()> {
        let args = vec!["vm.power".into(), "-on".into(), self.vm_name().into()];
        self.run("power on", args).await?;
        Ok(())
    }

    async fn power_off(&self) -> BackendResult<()> {
        let args = vec!["vm.power".into(), "-off".into(), self.vm_name().into()];
        self.run("power off", args).await?;
        Ok(())
    }

    async fn destroy(&self) -> BackendResult<()> {
        let args = vec!["vm.destroy".into(), self.vm_name().into()];
        self.run("destroy VM", args).await?;
        Ok(())
    }

    async fn query_power_state(&self) -> BackendResult<String> {
        let args = vec!["vm.info".into(), self.vm_name().into()];
        self.run("query power state", args).await
    }

    async fn fetch_guest_ip(&self) -> BackendResult<String> {
        let args = vec!["vm.ip".into(), self.vm_name().into()];
        self.run("fetch guest IP", args).await
    }

    async fn guest_create_directory(&self, login: &GuestLogin, path: &str) -> BackendResult<()> {
        let mut args = self.guest_args("guest.mkdir", login);
        args.push("-p".into());
        args.push(path.into());
        self.run("create guest directory", args).await?;
        Ok(())
    }

    async fn guest_upload_file(
        &self,
        login: &GuestLogin,
        local_path: &Path,
        remote_path: &str,
    ) -> BackendResult<()> {
        let mut args = self.guest_args("guest.upload", login);
        args.push("-f".into());
        args.push(local_path.to_string_lossy().into_owned());
        args.push(remote_path.into());
        self.run("upload guest file", args).await?;
        Ok(())
    }
}
