//! Canary migration state machine.
//!
//! A migration gradually shifts traffic from one model to another in
//! percentage steps, gated on health signals sampled from the router.
//! The controller owns a single active-migration slot; all advance,
//! hold, and rollback decisions are linearized through that slot's
//! mutex, so two concurrent step checks can never double-advance.
//!
//! Step checks run opportunistically on access (`record_sample`,
//! `current_split`, `status`) rather than from a timer thread. The
//! router-facing traffic split is published as an atomically swapped
//! immutable snapshot, so readers never observe partially updated
//! percentages.
//!
//! State machine:
//!
//! ```text
//! Pending ── start ──> RampingUp ── healthy steps ──> Holding ──> Succeeded
//!                          │                             │
//!                          └── unhealthy ──> RolledBack <┘
//!                any non-terminal ── operator cancel ──> Aborted
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::registry::ModelRegistry;
use crate::telemetry;
use crate::{MimirError, Result};

/// Maximum health samples retained between step checks.
const MAX_HEALTH_SAMPLES: usize = 1024;

/// Health thresholds a canary must satisfy to keep ramping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    /// Maximum acceptable error rate over a step interval (0.0..=1.0).
    pub max_error_rate: f64,
    /// Maximum acceptable p95 latency over a step interval.
    pub max_latency: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.05,
            max_latency: Duration::from_secs(10),
        }
    }
}

/// Parameters for starting a migration.
#[derive(Debug, Clone)]
pub struct MigrationSpec {
    pub from_model: String,
    pub to_model: String,
    /// Final percentage of traffic for `to_model` (0, 100].
    pub target_percentage: f64,
    /// Percentage added per healthy step.
    pub step_size: f64,
    /// Time between step checks; also the health sample window.
    pub step_interval: Duration,
    pub thresholds: HealthThresholds,
}

/// Lifecycle status of a migration. Terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanaryStatus {
    Pending,
    RampingUp,
    Holding,
    Succeeded,
    RolledBack,
    Aborted,
}

impl CanaryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CanaryStatus::Succeeded | CanaryStatus::RolledBack | CanaryStatus::Aborted
        )
    }
}

/// One routing outcome observed by the router for a canary pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    pub at: Instant,
    pub success: bool,
    pub latency: Duration,
}

/// Snapshot of a migration's state.
#[derive(Debug, Clone)]
pub struct CanaryState {
    pub from_model: String,
    pub to_model: String,
    pub current_percentage: f64,
    pub target_percentage: f64,
    pub step_size: f64,
    pub step_interval: Duration,
    pub started_at: Instant,
    pub status: CanaryStatus,
    /// Samples gathered during the current step interval.
    pub health_samples: Vec<HealthSample>,
}

/// The traffic split the router reads on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSplit {
    pub from_model: String,
    pub to_model: String,
    /// Share of traffic for `to_model`, in [0, 100].
    pub percentage: f64,
}

struct Migration {
    spec: MigrationSpec,
    status: CanaryStatus,
    current_percentage: f64,
    started_at: Instant,
    last_step_at: Instant,
    samples: VecDeque<HealthSample>,
}

/// Controller for at most one active migration.
pub struct CanaryController {
    registry: Arc<ModelRegistry>,
    active: Mutex<Option<Migration>>,
    split: RwLock<Option<Arc<TrafficSplit>>>,
}

impl CanaryController {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            active: Mutex::new(None),
            split: RwLock::new(None),
        }
    }

    /// Start a migration at the current time.
    pub fn start_migration(&self, spec: MigrationSpec) -> Result<()> {
        self.start_migration_at(spec, Instant::now())
    }

    /// Start a migration at an explicit `now`.
    ///
    /// Fails with [`MimirError::MigrationInProgress`] if a non-terminal
    /// migration already occupies the slot, and with
    /// [`MimirError::InvalidMigration`] / [`MimirError::ModelNotFound`]
    /// on bad parameters. Traffic starts at 0% for the target model and
    /// ramps on the first healthy step check.
    pub fn start_migration_at(&self, spec: MigrationSpec, now: Instant) -> Result<()> {
        self.validate(&spec)?;

        let mut active = self.active.lock().expect("canary slot poisoned");
        if let Some(current) = active.as_ref()
            && !current.status.is_terminal()
        {
            return Err(MimirError::MigrationInProgress);
        }

        info!(
            from = %spec.from_model,
            to = %spec.to_model,
            target = spec.target_percentage,
            "starting canary migration"
        );

        let mut migration = Migration {
            spec,
            status: CanaryStatus::Pending,
            current_percentage: 0.0,
            started_at: now,
            last_step_at: now,
            samples: VecDeque::new(),
        };
        migration.status = CanaryStatus::RampingUp;
        self.publish_split(Some(&migration));
        *active = Some(migration);
        Ok(())
    }

    /// Record a routing outcome for a model at the current time.
    pub fn record_sample(&self, model_id: &str, success: bool, latency: Duration) {
        self.record_sample_at(model_id, success, latency, Instant::now());
    }

    /// Record a routing outcome at an explicit `now`.
    ///
    /// Samples for models outside the active pair are ignored. Recording
    /// also runs the opportunistic step check.
    pub fn record_sample_at(&self, model_id: &str, success: bool, latency: Duration, now: Instant) {
        let mut active = self.active.lock().expect("canary slot poisoned");
        let Some(migration) = active.as_mut() else {
            return;
        };
        if migration.status.is_terminal() {
            return;
        }
        if model_id != migration.spec.from_model && model_id != migration.spec.to_model {
            return;
        }
        if migration.samples.len() == MAX_HEALTH_SAMPLES {
            migration.samples.pop_front();
        }
        migration.samples.push_back(HealthSample {
            at: now,
            success,
            latency,
        });
        self.step_check(migration, now);
    }

    /// The split the router should apply right now, if a migration is
    /// ramping or holding. Runs the opportunistic step check first.
    pub fn current_split(&self) -> Option<Arc<TrafficSplit>> {
        self.current_split_at(Instant::now())
    }

    /// As [`current_split`](Self::current_split) at an explicit `now`.
    pub fn current_split_at(&self, now: Instant) -> Option<Arc<TrafficSplit>> {
        {
            let mut active = self.active.lock().expect("canary slot poisoned");
            if let Some(migration) = active.as_mut() {
                self.step_check(migration, now);
            }
        }
        self.split.read().expect("split lock poisoned").clone()
    }

    /// Snapshot of the current (or most recently finished) migration.
    pub fn status(&self) -> Result<CanaryState> {
        self.status_at(Instant::now())
    }

    /// As [`status`](Self::status) at an explicit `now`.
    pub fn status_at(&self, now: Instant) -> Result<CanaryState> {
        let mut active = self.active.lock().expect("canary slot poisoned");
        let migration = active.as_mut().ok_or(MimirError::NoActiveMigration)?;
        self.step_check(migration, now);
        Ok(migration.snapshot())
    }

    /// Operator cancel: traffic reverts to the from-model at 100%.
    pub fn abort(&self) -> Result<CanaryState> {
        let mut active = self.active.lock().expect("canary slot poisoned");
        let migration = active.as_mut().ok_or(MimirError::NoActiveMigration)?;
        if migration.status.is_terminal() {
            return Err(MimirError::NoActiveMigration);
        }
        warn!(
            from = %migration.spec.from_model,
            to = %migration.spec.to_model,
            "canary migration aborted by operator"
        );
        migration.status = CanaryStatus::Aborted;
        migration.current_percentage = 0.0;
        self.publish_split(None);
        Ok(migration.snapshot())
    }

    /// Evaluate one step if the interval has elapsed. Caller holds the
    /// active-slot lock, so at most one decision commits at a time.
    fn step_check(&self, migration: &mut Migration, now: Instant) {
        if !matches!(
            migration.status,
            CanaryStatus::RampingUp | CanaryStatus::Holding
        ) {
            return;
        }
        if now.duration_since(migration.last_step_at) < migration.spec.step_interval {
            return;
        }

        // Only samples from the current interval inform the decision;
        // anything older is stale.
        let window_start = now
            .checked_sub(migration.spec.step_interval)
            .unwrap_or(migration.last_step_at);
        migration.samples.retain(|s| s.at >= window_start);

        if migration.samples.is_empty() {
            // No traffic observed; hold position rather than advance
            // blind or roll back a healthy-but-idle canary.
            migration.last_step_at = now;
            return;
        }

        let healthy = self.evaluate_health(migration);
        if !healthy {
            warn!(
                from = %migration.spec.from_model,
                to = %migration.spec.to_model,
                percentage = migration.current_percentage,
                "canary health violated, rolling back"
            );
            metrics::counter!(telemetry::CANARY_ROLLBACKS_TOTAL).increment(1);
            migration.status = CanaryStatus::RolledBack;
            migration.current_percentage = 0.0;
            self.publish_split(None);
            return;
        }

        match migration.status {
            CanaryStatus::RampingUp => {
                migration.current_percentage = (migration.current_percentage
                    + migration.spec.step_size)
                    .min(migration.spec.target_percentage);
                metrics::counter!(telemetry::CANARY_STEPS_TOTAL).increment(1);
                info!(
                    to = %migration.spec.to_model,
                    percentage = migration.current_percentage,
                    "canary advanced"
                );
                if migration.current_percentage >= migration.spec.target_percentage {
                    migration.status = CanaryStatus::Holding;
                }
                self.publish_split(Some(migration));
            }
            CanaryStatus::Holding => {
                // One further healthy interval at target: promote.
                match self.registry.set_default(&migration.spec.to_model) {
                    Ok(()) => {
                        info!(
                            to = %migration.spec.to_model,
                            "canary succeeded, promoted to default"
                        );
                        migration.status = CanaryStatus::Succeeded;
                        self.publish_split(None);
                    }
                    Err(e) => {
                        warn!(error = %e, "canary promotion failed, rolling back");
                        metrics::counter!(telemetry::CANARY_ROLLBACKS_TOTAL).increment(1);
                        migration.status = CanaryStatus::RolledBack;
                        migration.current_percentage = 0.0;
                        self.publish_split(None);
                    }
                }
            }
            _ => unreachable!("step_check only runs for ramping or holding"),
        }

        migration.samples.clear();
        migration.last_step_at = now;
    }

    fn evaluate_health(&self, migration: &Migration) -> bool {
        let total = migration.samples.len();
        let failures = migration.samples.iter().filter(|s| !s.success).count();
        let error_rate = failures as f64 / total as f64;
        if error_rate > migration.spec.thresholds.max_error_rate {
            return false;
        }
        let mut latencies: Vec<Duration> =
            migration.samples.iter().map(|s| s.latency).collect();
        latencies.sort_unstable();
        p95(&latencies) <= migration.spec.thresholds.max_latency
    }

    fn publish_split(&self, migration: Option<&Migration>) {
        let split = migration.map(|m| {
            Arc::new(TrafficSplit {
                from_model: m.spec.from_model.clone(),
                to_model: m.spec.to_model.clone(),
                percentage: m.current_percentage,
            })
        });
        *self.split.write().expect("split lock poisoned") = split;
    }

    fn validate(&self, spec: &MigrationSpec) -> Result<()> {
        if spec.from_model == spec.to_model {
            return Err(MimirError::InvalidMigration(
                "from and to models must differ".to_owned(),
            ));
        }
        if self.registry.get(&spec.from_model).is_none() {
            return Err(MimirError::ModelNotFound(spec.from_model.clone()));
        }
        if !self.registry.is_routable(&spec.to_model) {
            return Err(MimirError::ModelNotFound(spec.to_model.clone()));
        }
        if !(spec.target_percentage > 0.0 && spec.target_percentage <= 100.0) {
            return Err(MimirError::InvalidMigration(
                "target percentage must be in (0, 100]".to_owned(),
            ));
        }
        if !(spec.step_size > 0.0 && spec.step_size <= 100.0) {
            return Err(MimirError::InvalidMigration(
                "step size must be in (0, 100]".to_owned(),
            ));
        }
        if spec.step_interval.is_zero() {
            return Err(MimirError::InvalidMigration(
                "step interval must be non-zero".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&spec.thresholds.max_error_rate) {
            return Err(MimirError::InvalidMigration(
                "max error rate must be in [0, 1]".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Migration {
    fn snapshot(&self) -> CanaryState {
        CanaryState {
            from_model: self.spec.from_model.clone(),
            to_model: self.spec.to_model.clone(),
            current_percentage: self.current_percentage,
            target_percentage: self.spec.target_percentage,
            step_size: self.spec.step_size,
            step_interval: self.spec.step_interval,
            started_at: self.started_at,
            status: self.status,
            health_samples: self.samples.iter().copied().collect(),
        }
    }
}

/// p95 over sorted latencies (nearest-rank).
fn p95(sorted: &[Duration]) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p95_nearest_rank() {
        let mut latencies: Vec<Duration> =
            (1..=100).map(Duration::from_millis).collect();
        latencies.sort_unstable();
        assert_eq!(p95(&latencies), Duration::from_millis(95));

        let few = vec![Duration::from_millis(10), Duration::from_millis(20)];
        assert_eq!(p95(&few), Duration::from_millis(20));

        assert_eq!(p95(&[]), Duration::ZERO);
    }

    #[test]
    fn terminal_statuses() {
        assert!(CanaryStatus::Succeeded.is_terminal());
        assert!(CanaryStatus::RolledBack.is_terminal());
        assert!(CanaryStatus::Aborted.is_terminal());
        assert!(!CanaryStatus::RampingUp.is_terminal());
        assert!(!CanaryStatus::Holding.is_terminal());
        assert!(!CanaryStatus::Pending.is_terminal());
    }
}
