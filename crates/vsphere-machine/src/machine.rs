//! Machine store operations behind the subcommands.

use crate::config::HostConfig;
use std::path::Path;
use vsphere_driver::{generate_machine_name, CreateOptions, Driver, DriverRegistry, MachineConfig};

/// Create a machine store and provision the machine in it.
///
/// If provisioning fails before the machine exists on the backend, the store
/// is discarded so the same name can be created again.
pub async fn create(
    host: &HostConfig,
    registry: &DriverRegistry,
    driver_name: &str,
    name: Option<String>,
    options: CreateOptions,
) -> anyhow::Result<Box<dyn Driver>> {
    let name = name.unwrap_or_else(generate_machine_name);
    let store = host.new_store(&name)?;

    let mut config = MachineConfig::new(&store);
    config.machine_name = name.clone();
    config.apply_options(options);
    config.validate()?;

    let mut driver = registry.create(driver_name, config.clone())?;
    config.save().await?;

    if let Err(e) = driver.create().await {
        if e.precedes_provisioning() {
            tracing::warn!(machine = %name, error = %e, "Create failed, discarding machine store");
            discard_store(&store).await;
        } else {
            tracing::error!(
                machine = %name,
                error = %e,
                "Create failed after provisioning started"
            );
        }
        return Err(e.into());
    }
    Ok(driver)
}

/// Load a saved machine and build its driver.
pub async fn open(
    host: &HostConfig,
    registry: &DriverRegistry,
    driver_name: &str,
    name: &str,
) -> anyhow::Result<Box<dyn Driver>> {
    let store = host.existing_store(name)?;
    let config = MachineConfig::load(&store).await?;
    Ok(registry.create(driver_name, config)?)
}

/// Remove the machine from the backend, then delete its store.
///
/// With `force`, the store is deleted even when the backend removal fails.
pub async fn remove(
    host: &HostConfig,
    registry: &DriverRegistry,
    driver_name: &str,
    name: &str,
    force: bool,
) -> anyhow::Result<()> {
    let store = host.existing_store(name)?;

    let removed = match open(host, registry, driver_name, name).await {
        Ok(driver) => driver.remove().await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    if let Err(e) = removed {
        if !force {
            return Err(e);
        }
        tracing::warn!(
            machine = %name,
            error = %e,
            "Backend removal failed, deleting store anyway"
        );
    }

    tokio::fs::remove_dir_all(&store).await?;
    tracing::info!(machine = %name, store = %store.display(), "Machine removed");
    Ok(())
}

async fn discard_store(store: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(store).await {
        tracing::warn!(store = %store.display(), error = %e, "Failed to discard machine store");
    }
}
