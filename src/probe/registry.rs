//! Probe registry.
//!
//! Holds the canonical, ordered set of probes known to the process. Built
//! and configured at startup, then shared immutably (`Arc<ProbeRegistry>`)
//! with every pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::probe::{Probe, default_probes};
use crate::source::ServerVersion;

/// Metadata about a registered probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    /// Probe name.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Minimum server version.
    pub min_version: ServerVersion,
    /// Whether the probe runs in passes.
    pub enabled: bool,
}

struct Entry {
    probe: Arc<dyn Probe>,
    enabled: bool,
}

/// Ordered registry of probes with per-probe enablement.
#[derive(Default)]
pub struct ProbeRegistry {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistry")
            .field("probe_count", &self.entries.len())
            .field("enabled_count", &self.enabled().count())
            .finish_non_exhaustive()
    }
}

impl ProbeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every shipped probe under `namespace`.
    pub fn with_defaults(namespace: &str) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for probe in default_probes(namespace)? {
            registry.register(probe)?;
        }
        Ok(registry)
    }

    /// Register a probe, enabled per [`Probe::enabled_by_default`].
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateProbe` if the name is already taken.
    pub fn register(&mut self, probe: Arc<dyn Probe>) -> Result<(), ConfigError> {
        if self.position(probe.name()).is_some() {
            return Err(ConfigError::DuplicateProbe(probe.name().to_string()));
        }

        let enabled = probe.enabled_by_default();
        tracing::debug!(
            probe = %probe.name(),
            min_version = %probe.min_version(),
            enabled,
            "Probe registered"
        );
        self.entries.push(Entry { probe, enabled });
        Ok(())
    }

    /// Enable or disable a registered probe.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownProbe` if no probe has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        let index = self
            .position(name)
            .ok_or_else(|| ConfigError::UnknownProbe(name.to_string()))?;
        self.entries[index].enabled = enabled;
        Ok(())
    }

    /// Apply a name → enabled mapping from configuration.
    pub fn apply_toggles(&mut self, toggles: &BTreeMap<String, bool>) -> Result<(), ConfigError> {
        for (name, enabled) in toggles {
            self.set_enabled(name, *enabled)?;
        }
        Ok(())
    }

    /// Enabled probes in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<dyn Probe>> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| &entry.probe)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|index| self.entries[index].enabled)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Probe>> {
        self.position(name).map(|index| &self.entries[index].probe)
    }

    /// List all registered probes.
    pub fn list(&self) -> Vec<ProbeInfo> {
        self.entries
            .iter()
            .map(|entry| ProbeInfo {
                name: entry.probe.name().to_string(),
                help: entry.probe.help().to_string(),
                min_version: entry.probe.min_version(),
                enabled: entry.enabled,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.probe.name() == name)
    }
}
