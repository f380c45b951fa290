//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vsphere_driver::{
    CreateOptions, DEFAULT_CPU, DEFAULT_DISK_SIZE_MB, DEFAULT_MEMORY_MB, DRIVER_NAME,
};

/// Provision and manage docker hosts on VMware vSphere.
#[derive(Debug, Parser)]
#[command(name = "vsphere-machine", version, about)]
pub struct Cli {
    /// Directory holding machine stores (overrides VSPHERE_MACHINE_STORAGE_PATH)
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Driver used to manage the machine
    #[arg(long, global = true, default_value = DRIVER_NAME)]
    pub driver: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create and start a machine
    Create(CreateArgs),
    /// Start a machine
    Start(MachineArg),
    /// Stop a machine
    Stop(MachineArg),
    /// Restart a machine
    Restart(MachineArg),
    /// Kill a machine
    Kill(MachineArg),
    /// Remove a machine and its local store
    Rm(RemoveArgs),
    /// Upgrade a machine
    Upgrade(MachineArg),
    /// Print the lifecycle state of a machine
    State(MachineArg),
    /// Print the IP address of a machine
    Ip(MachineArg),
    /// Print the docker URL of a machine
    Url(MachineArg),
    /// Log into or run a command on a machine with SSH
    Ssh(SshArgs),
    /// List available drivers
    Drivers,
}

#[derive(Debug, Args)]
pub struct MachineArg {
    /// Machine name
    pub name: String,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Machine name
    pub name: String,

    /// Delete the local store even if the machine cannot be removed remotely
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct SshArgs {
    /// Machine name
    pub name: String,

    /// Command to run instead of an interactive shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Machine name (generated if omitted)
    pub name: Option<String>,

    /// vSphere CPU number for docker VM
    #[arg(long = "vsphere-cpu", env = "VSPHERE_CPU_COUNT", default_value_t = DEFAULT_CPU)]
    pub cpu: u32,

    /// vSphere size of memory for docker VM (in MB)
    #[arg(
        long = "vsphere-memory",
        env = "VSPHERE_MEMORY_SIZE",
        default_value_t = DEFAULT_MEMORY_MB
    )]
    pub memory: u32,

    /// vSphere size of disk for docker VM (in MB)
    #[arg(
        long = "vsphere-disk-size",
        env = "VSPHERE_DISK_SIZE",
        default_value_t = DEFAULT_DISK_SIZE_MB
    )]
    pub disk_size: u32,

    /// vSphere URL for boot2docker image
    #[arg(long = "vsphere-boot2docker-url", env = "VSPHERE_BOOT2DOCKER_URL", default_value = "")]
    pub boot2docker_url: String,

    /// vSphere IP/hostname for vCenter
    #[arg(long = "vsphere-vcenter", env = "VSPHERE_VCENTER", default_value = "")]
    pub vcenter: String,

    /// vSphere username
    #[arg(long = "vsphere-username", env = "VSPHERE_USERNAME", default_value = "")]
    pub username: String,

    /// vSphere password
    #[arg(
        long = "vsphere-password",
        env = "VSPHERE_PASSWORD",
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    /// vSphere network where the docker VM will be attached
    #[arg(long = "vsphere-network", env = "VSPHERE_NETWORK", default_value = "")]
    pub network: String,

    /// vSphere datastore for docker VM
    #[arg(long = "vsphere-datastore", env = "VSPHERE_DATASTORE", default_value = "")]
    pub datastore: String,

    /// vSphere datacenter for docker VM
    #[arg(long = "vsphere-datacenter", env = "VSPHERE_DATACENTER", default_value = "")]
    pub datacenter: String,

    /// vSphere resource pool for docker VM
    #[arg(long = "vsphere-pool", env = "VSPHERE_POOL")]
    pub pool: Option<String>,

    /// vSphere compute host IP where the docker VM will be instantiated
    #[arg(long = "vsphere-compute-ip", env = "VSPHERE_COMPUTE_IP")]
    pub compute_ip: Option<String>,

    /// Public key file to authorize for the docker daemon (repeatable)
    #[arg(long = "authorized-key")]
    pub authorized_keys: Vec<PathBuf>,
}

impl From<CreateArgs> for CreateOptions {
    fn from(args: CreateArgs) -> Self {
        Self {
            cpu: args.cpu,
            memory_mb: args.memory,
            disk_size_mb: args.disk_size,
            boot2docker_url: args.boot2docker_url,
            vcenter: args.vcenter,
            username: args.username,
            password: args.password,
            network: args.network,
            datastore: args.datastore,
            datacenter: args.datacenter,
            pool: args.pool,
            host_ip: args.compute_ip,
            authorized_keys: args.authorized_keys,
        }
    }
}
