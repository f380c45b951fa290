//! Caller-owned registry of machine drivers.
//!
//! Hosts build a registry at startup and register each driver they support
//! explicitly; nothing registers itself behind the host's back.

use crate::config::MachineConfig;
use crate::driver::Driver;
use crate::error::{DriverError, Result};
use std::collections::BTreeMap;

/// Constructor for a driver instance bound to one machine.
pub type DriverFactory = Box<dyn Fn(MachineConfig) -> Result<Box<dyn Driver>> + Send + Sync>;

/// Drivers available to a host, keyed by driver name.
#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(MachineConfig) -> Result<Box<dyn Driver>> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(name.to_string(), Box::new(factory))
            .is_some()
        {
            tracing::warn!(driver = name, "Replacing registered driver");
        }
    }

    /// Names of all registered drivers, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the driver registered under `name` for the given machine.
    ///
    /// # Errors
    /// Returns [`DriverError::UnknownDriver`] if nothing is registered under `name`.
    pub fn create(&self, name: &str, config: MachineConfig) -> Result<Box<dyn Driver>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DriverError::UnknownDriver(name.to_string()))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_driver() {
        let registry = DriverRegistry::new();
        assert!(registry.names().is_empty());
        match registry.create("virtualbox", MachineConfig::default()) {
            Err(DriverError::UnknownDriver(name)) => assert_eq!(name, "virtualbox"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut registry = DriverRegistry::new();
        registry.register("broken", |_| Err(DriverError::Unsupported("broken".into())));
        assert_eq!(registry.names(), vec!["broken"]);
        assert!(matches!(
            registry.create("broken", MachineConfig::default()),
            Err(DriverError::Unsupported(_))
        ));
    }
}
