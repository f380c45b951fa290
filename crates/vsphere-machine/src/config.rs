//! Host configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::path::{Path, PathBuf};
use vsphere_driver::CONFIG_FILE_NAME;

/// Configuration for the vsphere-machine host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Directory holding one store per machine.
    pub storage_path: PathBuf,

    /// Path to the govc binary.
    pub govc_path: PathBuf,
}

/// Machine lookup error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid machine name: {0:?}")]
    InvalidName(String),

    #[error("machine {0} does not exist")]
    NotFound(String),

    #[error("machine {0} already exists")]
    AlreadyExists(String),
}

impl Default for HostConfig {
    fn default() -> Self {
        let storage_path = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".docker/machine/machines"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/vsphere-machine/machines"));
        Self {
            storage_path,
            govc_path: PathBuf::from("govc"),
        }
    }
}

impl HostConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `VSPHERE_MACHINE_STORAGE_PATH` | `$HOME/.docker/machine/machines` |
    /// | `VSPHERE_MACHINE_GOVC` | `govc` |
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            storage_path: std::env::var("VSPHERE_MACHINE_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.storage_path),
            govc_path: std::env::var("VSPHERE_MACHINE_GOVC")
                .map(PathBuf::from)
                .unwrap_or(default.govc_path),
        }
    }

    /// Store directory for the named machine.
    ///
    /// Names become directory names, so anything that could escape the
    /// storage root is rejected.
    pub fn machine_store(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ConfigError::InvalidName(name.to_string()));
        }
        Ok(self.storage_path.join(name))
    }

    /// Store directory of an existing machine.
    pub fn existing_store(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let store = self.machine_store(name)?;
        if !has_config(&store) {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        Ok(store)
    }

    /// Store directory for a machine about to be created.
    pub fn new_store(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let store = self.machine_store(name)?;
        if has_config(&store) {
            return Err(ConfigError::AlreadyExists(name.to_string()));
        }
        Ok(store)
    }
}

fn has_config(store: &Path) -> bool {
    store.join(CONFIG_FILE_NAME).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.govc_path, PathBuf::from("govc"));
        assert!(config.storage_path.ends_with("machines"));
    }

    #[test]
    fn test_from_env_uses_defaults() {
        std::env::remove_var("VSPHERE_MACHINE_STORAGE_PATH");
        std::env::remove_var("VSPHERE_MACHINE_GOVC");

        assert_eq!(HostConfig::from_env(), HostConfig::default());
    }

    #[test]
    fn test_machine_store_rejects_escaping_names() {
        let config = HostConfig {
            storage_path: PathBuf::from("/machines"),
            govc_path: PathBuf::from("govc"),
        };
        assert_eq!(
            config.machine_store("docker-host-1a2b").unwrap(),
            PathBuf::from("/machines/docker-host-1a2b")
        );
        for name in ["", ".", "..", "../etc", "a/b", "with space"] {
            assert!(
                matches!(config.machine_store(name), Err(ConfigError::InvalidName(_))),
                "{name:?} accepted"
            );
        }
    }

    #[test]
    fn test_existing_and_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig {
            storage_path: dir.path().to_path_buf(),
            govc_path: PathBuf::from("govc"),
        };

        assert!(matches!(
            config.existing_store("dev"),
            Err(ConfigError::NotFound(_))
        ));
        assert!(config.new_store("dev").is_ok());

        std::fs::create_dir_all(dir.path().join("dev")).unwrap();
        std::fs::write(dir.path().join("dev").join(CONFIG_FILE_NAME), "{}").unwrap();

        assert!(config.existing_store("dev").is_ok());
        assert!(matches!(
            config.new_store("dev"),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
