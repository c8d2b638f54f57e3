//! Version and feature gating.
//!
//! A probe is eligible for a pass iff the live server version is at least
//! its [`Probe::min_version`] and its [`Probe::prerequisite`], if any, reads
//! back as enabled.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::probe::Probe;
use crate::source::{DataSource, ServerVersion};

/// Server-side feature a probe depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureGate {
    /// A global server variable that must be `ON`/`1`.
    GlobalVariable(&'static str),
}

/// Per-user/table statistics collection (`userstat`), off by default.
pub const USERSTAT: FeatureGate = FeatureGate::GlobalVariable("userstat");

impl FeatureGate {
    /// Cheap single-row lookup returning `(name, value)`.
    pub fn query(&self) -> String {
        match self {
            Self::GlobalVariable(name) => {
                format!("SHOW GLOBAL VARIABLES WHERE Variable_name = '{name}'")
            }
        }
    }

    /// Read the feature state from the server.
    ///
    /// Never fails: read errors come back as [`GateStatus::Unavailable`].
    pub async fn check(&self, source: &dyn DataSource, cancel: &CancellationToken) -> GateStatus {
        let row = match source.query_row(&self.query(), cancel).await {
            Ok(Some(row)) => row,
            Ok(None) => return GateStatus::Disabled(format!("{self} is not supported")),
            Err(e) => return GateStatus::Unavailable(e.to_string()),
        };

        match row.text(1) {
            Ok(value) if is_truthy(&value) => GateStatus::Enabled,
            Ok(value) => GateStatus::Disabled(format!("{self} is {value}")),
            Err(e) => GateStatus::Unavailable(e.to_string()),
        }
    }
}

impl std::fmt::Display for FeatureGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GlobalVariable(name) => write!(f, "@@{name}"),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "ON" | "1" | "YES" | "TRUE"
    )
}

/// Result of a feature pre-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// Feature present and enabled.
    Enabled,
    /// Feature unsupported or switched off. Expected; not an error.
    Disabled(String),
    /// The pre-check read itself failed.
    Unavailable(String),
}

impl GateStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Feature states discovered for one pass.
#[derive(Debug, Clone, Default)]
pub struct FeatureState {
    statuses: HashMap<FeatureGate, GateStatus>,
}

impl FeatureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check each distinct gate once, sequentially.
    pub async fn discover<'a>(
        gates: impl IntoIterator<Item = &'a FeatureGate>,
        source: &dyn DataSource,
        cancel: &CancellationToken,
    ) -> Self {
        let mut state = Self::new();
        for gate in gates {
            if state.statuses.contains_key(gate) {
                continue;
            }
            let status = gate.check(source, cancel).await;
            tracing::debug!(gate = %gate, status = ?status, "Feature gate checked");
            state.statuses.insert(*gate, status);
        }
        state
    }

    pub fn insert(&mut self, gate: FeatureGate, status: GateStatus) {
        self.statuses.insert(gate, status);
    }

    pub fn status(&self, gate: &FeatureGate) -> Option<&GateStatus> {
        self.statuses.get(gate)
    }
}

/// Decide whether `probe` may run against a server at `version`.
///
/// A prerequisite that was never checked counts as not enabled.
pub fn eligible(probe: &dyn Probe, version: ServerVersion, features: &FeatureState) -> bool {
    if version < probe.min_version() {
        return false;
    }
    match probe.prerequisite() {
        None => true,
        Some(gate) => features.status(gate).is_some_and(GateStatus::is_enabled),
    }
}
