//! vsphere-machine entry point.
//!
//! Provisions docker hosts on vSphere and manages their lifecycle. Each
//! machine lives in its own store directory under the storage path, holding
//! its saved configuration, SSH key pair and boot image.
//!
//! Logs go to stderr; command results are printed on stdout.

mod cli;
mod config;
mod machine;

use clap::Parser;
use cli::{Cli, Command};
use config::HostConfig;
use machine::open;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vsphere_driver::{DriverRegistry, GovcConnector, OpenSsh};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("vsphere_driver=info".parse()?)
                .add_directive("vsphere_machine=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut host = HostConfig::from_env();
    if let Some(path) = cli.storage_path {
        host.storage_path = path;
    }
    tracing::debug!(?host, "Configuration loaded");

    let mut registry = DriverRegistry::new();
    vsphere_driver::register(
        &mut registry,
        Arc::new(GovcConnector::new(host.govc_path.clone())),
        Arc::new(OpenSsh),
    );

    match cli.command {
        Command::Create(args) => {
            let name = args.name.clone();
            let driver = machine::create(&host, &registry, &cli.driver, name, args.into()).await?;
            println!("{}", driver.url().await?);
            tracing::info!(machine = %driver.machine_name(), "Docker host is up and running");
        }
        Command::Start(m) => open(&host, &registry, &cli.driver, &m.name).await?.start().await?,
        Command::Stop(m) => open(&host, &registry, &cli.driver, &m.name).await?.stop().await?,
        Command::Restart(m) => {
            open(&host, &registry, &cli.driver, &m.name)
                .await?
                .restart()
                .await?
        }
        Command::Kill(m) => open(&host, &registry, &cli.driver, &m.name).await?.kill().await?,
        Command::Upgrade(m) => {
            open(&host, &registry, &cli.driver, &m.name)
                .await?
                .upgrade()
                .await?
        }
        Command::Rm(args) => {
            machine::remove(&host, &registry, &cli.driver, &args.name, args.force).await?
        }
        Command::State(m) => {
            let driver = open(&host, &registry, &cli.driver, &m.name).await?;
            println!("{}", driver.state().await?);
        }
        Command::Ip(m) => {
            let driver = open(&host, &registry, &cli.driver, &m.name).await?;
            println!("{}", driver.ip().await?);
        }
        Command::Url(m) => {
            let driver = open(&host, &registry, &cli.driver, &m.name).await?;
            println!("{}", driver.url().await?);
        }
        Command::Ssh(args) => {
            let driver = open(&host, &registry, &cli.driver, &args.name).await?;
            let ssh = driver.ssh_command(&args.args).await?;
            let status = ssh.to_command().status().await?;
            if !status.success() {
                std::process::exit(status.code().unwrap_or(1));
            }
        }
        Command::Drivers => {
            for name in registry.names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
