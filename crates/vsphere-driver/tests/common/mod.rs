//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vsphere_driver::{
    Backend, BackendError, BackendResult, Connector, DriverError, GuestLogin, MachineConfig,
    RemoteShell, SshCommand, VsphereDriver,
};

pub const POWERED_ON: &str = "Name:  docker-host-test\n  Power state:  poweredOn\n";
pub const POWERED_OFF: &str = "Name:  docker-host-test\n  Power state:  poweredOff\n";
pub const SUSPENDED: &str = "Name:  docker-host-test\n  Power state:  suspended\n";

#[derive(Debug, Default)]
struct BackendState {
    calls: Vec<String>,
    power_state: String,
    ip: Option<String>,
    failing: HashSet<String>,
    lost_file: Option<PathBuf>,
}

/// Backend that records every call and keeps a simulated power state.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn new(power_state: &str) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().power_state = power_state.to_string();
        backend
    }

    pub fn with_ip(self, ip: &str) -> Self {
        self.state.lock().unwrap().ip = Some(ip.to_string());
        self
    }

    /// Make the named primitive fail from now on.
    pub fn fail(&self, call: &str) {
        self.state.lock().unwrap().failing.insert(call.to_string());
    }

    /// Delete `path` locally when the datastore directory is created.
    pub fn lose_file_on_create_directory(&self, path: &Path) {
        self.state.lock().unwrap().lost_file = Some(path.to_path_buf());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Recorded calls that change remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "query_power_state" && c != "fetch_guest_ip")
            .collect()
    }

    fn record(&self, call: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        if state.failing.contains(call) {
            return Err(BackendError::new(call, "injected failure"));
        }
        Ok(())
    }

    fn set_power_state(&self, power_state: &str) {
        self.state.lock().unwrap().power_state = power_state.to_string();
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn create_directory(&self, _name: &str) -> BackendResult<()> {
        self.record("create_directory")?;
        let lost_file = self.state.lock().unwrap().lost_file.take();
        if let Some(path) = lost_file {
            std::fs::remove_file(path).unwrap();
        }
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path) -> BackendResult<()> {
        self.record("upload_file")?;
        assert!(local_path.exists(), "uploaded file must exist locally");
        Ok(())
    }

    async fn create_vm(&self, image_path: &str) -> BackendResult<()> {
        self.record("create_vm")?;
        assert_eq!(image_path, "boot2docker-iso/boot2docker.iso");
        self.set_power_state(POWERED_OFF);
        Ok(())
    }

    async fn create_disk(&self) -> BackendResult<()> {
        self.record("create_disk")
    }

    async fn attach_network(&self) -> BackendResult<()> {
        self.record("attach_network")
    }

    async fn power_on(&self) -> BackendResult<()> {
        self.record("power_on")?;
        self.set_power_state(POWERED_ON);
        Ok(())
    }

    async fn power_off(&self) -> BackendResult<()> {
        self.record("power_off")?;
        self.set_power_state(POWERED_OFF);
        Ok(())
    }

    async fn destroy(&self) -> BackendResult<()> {
        self.record("destroy")?;
        self.set_power_state("");
        Ok(())
    }

    async fn query_power_state(&self) -> BackendResult<String> {
        self.record("query_power_state")?;
        Ok(self.state.lock().unwrap().power_state.clone())
    }

    async fn fetch_guest_ip(&self) -> BackendResult<String> {
        self.record("fetch_guest_ip")?;
        self.state
            .lock()
            .unwrap()
            .ip
            .clone()
            .ok_or_else(|| BackendError::new("fetch_guest_ip", "no IP reported"))
    }

    async fn guest_create_directory(&self, login: &GuestLogin, path: &str) -> BackendResult<()> {
        self.record("guest_create_directory")?;
        assert_eq!(login, &GuestLogin::new("docker", "tcuser"));
        assert_eq!(path, "/home/docker/.ssh");
        Ok(())
    }

    async fn guest_upload_file(
        &self,
        _login: &GuestLogin,
        local_path: &Path,
        remote_path: &str,
    ) -> BackendResult<()> {
        self.record("guest_upload_file")?;
        assert!(local_path.ends_with("id_docker_host_vsphere.pub"));
        assert_eq!(remote_path, "/home/docker/.ssh/authorized_keys");
        Ok(())
    }
}

impl Connector for FakeBackend {
    fn connect(&self, _config: &MachineConfig) -> Box<dyn Backend> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Default)]
struct ShellState {
    keys: Vec<PathBuf>,
    commands: Vec<SshCommand>,
    fail_runs: bool,
}

/// Remote shell that writes placeholder keys and records commands.
#[derive(Debug, Clone, Default)]
pub struct FakeShell {
    state: Arc<Mutex<ShellState>>,
}

impl FakeShell {
    pub fn fail_runs(&self) {
        self.state.lock().unwrap().fail_runs = true;
    }

    pub fn keys(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn commands(&self) -> Vec<SshCommand> {
        self.state.lock().unwrap().commands.clone()
    }
}

#[async_trait]
impl RemoteShell for FakeShell {
    async fn generate_key_pair(&self, path: &Path) -> vsphere_driver::Result<()> {
        tokio::fs::write(path, "private").await?;
        tokio::fs::write(vsphere_driver::public_key_path(path), "ssh-rsa AAAA test").await?;
        self.state.lock().unwrap().keys.push(path.to_path_buf());
        Ok(())
    }

    async fn run(&self, command: &SshCommand) -> vsphere_driver::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.clone());
        if state.fail_runs {
            return Err(DriverError::RemoteCommand("injected failure".into()));
        }
        Ok(())
    }
}

/// A configuration with every required field set, rooted at `store`.
pub fn complete_config(store: &Path) -> MachineConfig {
    let mut config = MachineConfig::new(store);
    config.machine_name = "docker-host-test".into();
    config.vcenter = "vc.local".into();
    config.username = "admin".into();
    config.password = "secret".into();
    config.network = "VM Network".into();
    config.datastore = "datastore1".into();
    config.datacenter = "dc1".into();
    config
}

pub fn new_driver(
    config: MachineConfig,
    backend: &FakeBackend,
    shell: &FakeShell,
) -> VsphereDriver {
    VsphereDriver::new(config, Arc::new(backend.clone()), Arc::new(shell.clone()))
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
