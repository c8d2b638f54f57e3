//! Collection Orchestrator
//!
//! Runs one collection pass per inbound request: gate the enabled probes,
//! fan them out concurrently against the shared [`DataSource`], drain their
//! samples, and report per-probe and pass-level outcomes.
//!
//! # Pass lifecycle
//!
//! 1. **Gating**: read the (cached) server version, then the feature gates
//!    of the version-eligible probes, one read per distinct gate.
//! 2. **Running**: spawn one task per eligible probe into a [`JoinSet`],
//!    each with a child of the pass [`CancellationToken`].
//! 3. **Draining**: receive samples until every emitter is dropped. When
//!    the deadline expires the pass token is cancelled; tasks still alive
//!    after `cancel_grace` are aborted.
//! 4. **Reporting**: append the outcome samples from [`ExporterMetrics`].

mod outcome;
mod version_cache;

pub use outcome::{ExporterMetrics, PassOutcome, PassReport, ProbeOutcome, ProbeStatus};
pub use version_cache::VersionCache;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ConfigError;
use crate::metric::Sample;
use crate::probe::{Emitter, FeatureGate, FeatureState, GateStatus, Probe, ProbeError, ProbeRegistry, eligible};
use crate::source::{DataSource, ServerVersion, SourceError};

/// Default grace period between cancelling and aborting probe tasks.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(1);
/// Default server version cache TTL.
pub const DEFAULT_VERSION_TTL: Duration = Duration::from_secs(60);
/// Default capacity of the per-pass sample channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Deadline used when a timeout does not fit on the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// What a failed feature pre-check read means for dependent probes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GateFailurePolicy {
    /// Treat the probe as not applicable for this pass.
    #[default]
    Skip,
    /// Record a failed outcome for the probe and fail the pass.
    Fail,
}

/// Tunables of the orchestrator.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Namespace of the exporter's own metrics.
    pub namespace: String,
    pub cancel_grace: Duration,
    pub gate_failure: GateFailurePolicy,
    pub version_ttl: Duration,
    pub channel_capacity: usize,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            namespace: "mysql".to_string(),
            cancel_grace: DEFAULT_CANCEL_GRACE,
            gate_failure: GateFailurePolicy::default(),
            version_ttl: DEFAULT_VERSION_TTL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScrapeOptions {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_gate_failure(mut self, policy: GateFailurePolicy) -> Self {
        self.gate_failure = policy;
        self
    }

    pub fn with_version_ttl(mut self, ttl: Duration) -> Self {
        self.version_ttl = ttl;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Gating result: who runs, and who already failed.
struct Gated {
    version: ServerVersion,
    runnable: Vec<Arc<dyn Probe>>,
    failed: Vec<ProbeOutcome>,
}

/// Runs collection passes over a fixed probe registry.
pub struct Orchestrator {
    registry: Arc<ProbeRegistry>,
    source: Arc<dyn DataSource>,
    options: ScrapeOptions,
    exporter: ExporterMetrics,
    version: VersionCache,
    total_passes: AtomicU64,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("total_passes", &self.total_passes.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    /// Returns `ConfigError` if the namespace yields invalid metric names or
    /// the channel capacity is zero.
    pub fn new(
        registry: Arc<ProbeRegistry>,
        source: Arc<dyn DataSource>,
        options: ScrapeOptions,
    ) -> Result<Self, ConfigError> {
        if options.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel capacity must be greater than 0".to_string(),
            ));
        }
        let exporter = ExporterMetrics::new(&options.namespace)?;

        Ok(Self {
            version: VersionCache::new(options.version_ttl),
            registry,
            source,
            options,
            exporter,
            total_passes: AtomicU64::new(0),
        })
    }

    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// Read the live server version, bypassing the cache.
    pub async fn server_version(&self, timeout: Duration) -> Result<ServerVersion, SourceError> {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(timeout, self.source.server_version(&cancel)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                Err(SourceError::Cancelled)
            }
        }
    }

    /// Run one pass that must finish within `timeout` (plus the cancel
    /// grace period for probes that ignore cancellation). `Duration::MAX`
    /// means no deadline.
    ///
    /// Never fails: every problem is reflected in the returned outcome.
    pub async fn scrape(&self, timeout: Duration) -> PassReport {
        let started = Instant::now();
        let deadline = deadline_after(started, timeout);
        let total_passes = self.total_passes.fetch_add(1, Ordering::Relaxed) + 1;
        let pass_token = CancellationToken::new();

        let gated = match tokio::time::timeout_at(deadline, self.gate(&pass_token)).await {
            Ok(Ok(gated)) => Some(gated),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Server version unavailable, skipping probes");
                None
            }
            Err(_) => {
                pass_token.cancel();
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Gating timed out");
                None
            }
        };

        let (mut samples, outcome) = match gated {
            Some(gated) => {
                let version = gated.version;
                let (samples, probes) = self.run_probes(gated, deadline, &pass_token).await;
                let ok = probes.iter().all(|p| p.status.is_success());
                let outcome = PassOutcome {
                    probes,
                    server_version: Some(version),
                    up: true,
                    ok,
                    total_passes,
                    duration: started.elapsed(),
                };
                (samples, outcome)
            }
            None => {
                let outcome = PassOutcome {
                    probes: Vec::new(),
                    server_version: None,
                    up: false,
                    ok: false,
                    total_passes,
                    duration: started.elapsed(),
                };
                (Vec::new(), outcome)
            }
        };

        tracing::debug!(
            pass = total_passes,
            probes = outcome.probes.len(),
            samples = samples.len(),
            ok = outcome.ok,
            duration_ms = outcome.duration.as_millis() as u64,
            "Pass complete"
        );

        match self.exporter.samples(&outcome) {
            Ok(reported) => samples.extend(reported),
            Err(e) => tracing::error!(error = %e, "Failed to build outcome samples"),
        }

        PassReport { samples, outcome }
    }

    async fn gate(&self, cancel: &CancellationToken) -> Result<Gated, SourceError> {
        let version = self.version.get(self.source.as_ref(), cancel).await?;

        let candidates: Vec<Arc<dyn Probe>> = self
            .registry
            .enabled()
            .filter(|probe| {
                let fits = version >= probe.min_version();
                if !fits {
                    tracing::debug!(
                        probe = %probe.name(),
                        min_version = %probe.min_version(),
                        server_version = %version,
                        "Probe skipped: server too old"
                    );
                }
                fits
            })
            .cloned()
            .collect();

        let prerequisites: Vec<&FeatureGate> = candidates
            .iter()
            .filter_map(|probe| probe.prerequisite())
            .collect();
        let features = FeatureState::discover(
            prerequisites,
            self.source.as_ref(),
            cancel,
        )
        .await;

        let mut gated = Gated {
            version,
            runnable: Vec::with_capacity(candidates.len()),
            failed: Vec::new(),
        };
        for probe in candidates {
            if eligible(probe.as_ref(), version, &features) {
                gated.runnable.push(probe);
                continue;
            }

            let status = probe.prerequisite().and_then(|gate| features.status(gate));
            match status {
                Some(GateStatus::Unavailable(reason))
                    if self.options.gate_failure == GateFailurePolicy::Fail =>
                {
                    tracing::warn!(probe = %probe.name(), reason = %reason, "Feature check failed");
                    gated.failed.push(ProbeOutcome::new(
                        probe.name(),
                        Duration::ZERO,
                        ProbeStatus::Failed(format!("feature check failed: {reason}")),
                    ));
                }
                _ => {
                    tracing::debug!(probe = %probe.name(), status = ?status, "Probe skipped: feature not enabled");
                }
            }
        }
        Ok(gated)
    }

    async fn run_probes(
        &self,
        gated: Gated,
        deadline: Instant,
        pass_token: &CancellationToken,
    ) -> (Vec<Sample>, Vec<ProbeOutcome>) {
        let running_since = Instant::now();
        let (tx, mut rx) = mpsc::channel(self.options.channel_capacity);
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(gated.runnable.len());

        for probe in gated.runnable {
            let name = probe.name().to_string();
            let emitter = Emitter::new(name.as_str(), tx.clone());
            let source = Arc::clone(&self.source);
            let cancel = pass_token.child_token();
            let span = tracing::debug_span!("probe", probe = %name);

            let handle = tasks.spawn(
                async move {
                    let timer = Instant::now();
                    let result = probe.run(source.as_ref(), &emitter, &cancel).await;
                    let status = match result {
                        Ok(()) => ProbeStatus::Succeeded,
                        Err(ProbeError::Cancelled) => ProbeStatus::Cancelled,
                        Err(e) => ProbeStatus::Failed(e.to_string()),
                    };
                    ProbeOutcome::new(probe.name(), timer.elapsed(), status)
                }
                .instrument(span),
            );
            names.insert(handle.id(), name);
        }
        drop(tx);

        let mut samples = Vec::new();
        let timer = tokio::time::sleep_until(deadline);
        tokio::pin!(timer);
        let mut aborted = false;

        loop {
            tokio::select! {
                sample = rx.recv() => match sample {
                    Some(sample) => samples.push(sample),
                    None => break,
                },
                () = &mut timer, if !aborted => {
                    if pass_token.is_cancelled() {
                        tracing::warn!(remaining = tasks.len(), "Probes ignored cancellation, aborting");
                        tasks.abort_all();
                        aborted = true;
                    } else {
                        tracing::warn!("Pass deadline expired, cancelling probes");
                        pass_token.cancel();
                        timer
                            .as_mut()
                            .reset(deadline_after(Instant::now(), self.options.cancel_grace));
                    }
                }
            }
        }

        let mut outcomes = gated.failed;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    let status = if e.is_cancelled() {
                        ProbeStatus::Cancelled
                    } else {
                        ProbeStatus::Failed("probe task panicked".to_string())
                    };
                    ProbeOutcome::new(name, running_since.elapsed(), status)
                }
            };

            match &outcome.status {
                ProbeStatus::Succeeded => tracing::debug!(
                    probe = %outcome.name,
                    duration_ms = outcome.duration.as_millis() as u64,
                    "Probe succeeded"
                ),
                status => tracing::warn!(
                    probe = %outcome.name,
                    duration_ms = outcome.duration.as_millis() as u64,
                    status = %status,
                    "Probe did not succeed"
                ),
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        (samples, outcomes)
    }
}
