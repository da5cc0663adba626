//! Readiness state of a bring-up run
//!
//! A single [`State`] is created at startup and shared (behind an `Arc`) with
//! every probe: the API server poller, the DNS checker and the kubelet scrapers.
//! Probes only record what they observed; the state de-duplicates the log lines,
//! keeps the prometheus metrics in sync and owns the one-way readiness latch.

mod notify;

pub use notify::{NoopNotifier, ReadinessNotifier, SystemdNotifier, NOTIFY_SOCKET_ENV};

use std::sync::atomic::{AtomicI64, AtomicU64};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use serde::Serialize;
use tracing::{debug, info};

use crate::metrics::{MetricsRegistry, REGISTRY};
use crate::Result;

pub const VERSION_METRIC: &str = "kubelift_version";
pub const READY_METRIC: &str = "kubelift_ready";
pub const KUBELET_API_PODS_RUNNING_METRIC: &str = "kubelift_kubelet_api_pods_running";
pub const KUBELET_LOGS_PODS_RUNNING_METRIC: &str = "kubelift_kubelet_logs_pods_running";
pub const KUBELET_PROBE_FAILURES_METRIC: &str = "kubelift_kubelet_probe_failures";
pub const DNS_FAILURES_METRIC: &str = "kubelift_dns_failures";

/// Point-in-time copy of every tracked field
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub ready: bool,
    pub kubectl_applied: bool,
    pub api_server_probe_last_error: String,
    pub dns_last_error: String,
    pub kubelet_probe_failures: u64,
    pub kubelet_api_pod_running: i64,
    pub kubelet_logs_pod_running: i64,
}

/// Metric handles owned by a [`State`]
#[derive(Clone, Debug, Default)]
pub struct StateMetrics {
    version: Gauge<i64, AtomicI64>,
    ready: Gauge<i64, AtomicI64>,
    kubelet_api_pods_running: Gauge<i64, AtomicI64>,
    kubelet_logs_pods_running: Gauge<i64, AtomicI64>,
    kubelet_probe_failures: Counter<u64, AtomicU64>,
    dns_failures: Counter<u64, AtomicU64>,
}

impl StateMetrics {
    const NAMES: [&'static str; 6] = [
        VERSION_METRIC,
        READY_METRIC,
        KUBELET_API_PODS_RUNNING_METRIC,
        KUBELET_LOGS_PODS_RUNNING_METRIC,
        KUBELET_PROBE_FAILURES_METRIC,
        DNS_FAILURES_METRIC,
    ];

    fn register(&self, registry: &MetricsRegistry) -> Result<()> {
        registry.register_group(&Self::NAMES, |r| {
            r.register(VERSION_METRIC, "Kubelift version", self.version.clone());
            r.register(
                READY_METRIC,
                "Boolean for kubelift readiness",
                self.ready.clone(),
            );
            r.register(
                KUBELET_API_PODS_RUNNING_METRIC,
                "Number of kubelet API pods running",
                self.kubelet_api_pods_running.clone(),
            );
            r.register(
                KUBELET_LOGS_PODS_RUNNING_METRIC,
                "Number of kubelet logs pods running",
                self.kubelet_logs_pods_running.clone(),
            );
            r.register(
                KUBELET_PROBE_FAILURES_METRIC,
                "Total number of kubelet probe failures",
                self.kubelet_probe_failures.clone(),
            );
            r.register(
                DNS_FAILURES_METRIC,
                "Total number of dns query failures",
                self.dns_failures.clone(),
            );
        })
    }
}

/// Thread-safe readiness tracker fed by the probes
#[derive(Debug)]
pub struct State {
    inner: RwLock<StateSnapshot>,
    metrics: StateMetrics,
    notifier: Box<dyn ReadinessNotifier>,
}

impl State {
    /// Build the state on the process-global registry, notifying systemd when ready
    pub fn new() -> Result<Self> {
        Self::with_registry(&REGISTRY, Box::new(SystemdNotifier::from_env()))
    }

    /// Build the state on `registry`.
    ///
    /// Fails with [`crate::Error::Registration`] when the registry already holds
    /// one of the state metrics, i.e. when a second state is built on it.
    pub fn with_registry(
        registry: &MetricsRegistry,
        notifier: Box<dyn ReadinessNotifier>,
    ) -> Result<Self> {
        let metrics = StateMetrics::default();
        metrics.register(registry)?;
        metrics.version.set(1);

        Ok(Self {
            inner: RwLock::new(StateSnapshot::default()),
            metrics,
            notifier,
        })
    }

    /// Whether the API server is available and the manifests are applied
    pub fn is_ready(&self) -> bool {
        self.read().ready
    }

    /// Latch readiness and tell the service manager.
    ///
    /// The flag is set before the notification goes out and before the metric
    /// moves, so nobody observes an external "ready" while `is_ready` is false.
    pub fn set_ready(&self) {
        let was_ready = std::mem::replace(&mut self.write().ready, true);
        if !was_ready {
            info!("Kubernetes cluster is ready");
        }

        if let Err(e) = self.notifier.notify_ready() {
            debug!("Ignoring readiness notification failure: {}", e);
        }
        self.metrics.ready.set(1);
    }

    /// Mark that `kubectl apply` returned successfully
    pub fn set_kubectl_applied(&self) {
        self.write().kubectl_applied = true;
    }

    pub fn is_kubectl_applied(&self) -> bool {
        self.read().kubectl_applied
    }

    /// Record the latest API server probe error, logging it only when it changed
    pub fn set_api_server_probe_last_error(&self, msg: &str) {
        let mut state = self.write();
        log_if_changed(&mut state.api_server_probe_last_error, msg, |msg| {
            info!("Kubernetes apiserver not ready yet: {}", msg)
        });
    }

    pub fn api_server_probe_last_error(&self) -> String {
        self.read().api_server_probe_last_error.clone()
    }

    /// Record the latest DNS error, logging it only when it changed.
    ///
    /// Every call counts as a DNS failure, whether the message changed or not.
    pub fn set_dns_last_error(&self, msg: &str) {
        {
            let mut state = self.write();
            log_if_changed(&mut state.dns_last_error, msg, |msg| {
                info!("Kubernetes dns not ready yet: {}", msg)
            });
        }
        self.metrics.dns_failures.inc();
    }

    pub fn dns_last_error(&self) -> String {
        self.read().dns_last_error.clone()
    }

    pub fn inc_kubelet_probe_failures(&self) {
        self.write().kubelet_probe_failures += 1;
        self.metrics.kubelet_probe_failures.inc();
    }

    pub fn kubelet_probe_failures(&self) -> u64 {
        self.read().kubelet_probe_failures
    }

    /// Record the running pods reported by the kubelet API
    pub fn set_kubelet_api_pod_running(&self, count: i64) {
        {
            let mut state = self.write();
            log_if_changed(&mut state.kubelet_api_pod_running, &count, |count| {
                info!("Kubelet API reports {} running pods", count)
            });
        }
        self.metrics.kubelet_api_pods_running.set(count);
    }

    pub fn kubelet_api_pod_running(&self) -> i64 {
        self.read().kubelet_api_pod_running
    }

    /// Record the running pods found under the kubelet pod log directory
    pub fn set_kubelet_logs_pod_running(&self, count: i64) {
        {
            let mut state = self.write();
            log_if_changed(&mut state.kubelet_logs_pod_running, &count, |count| {
                info!("Kubelet log reports {} running pods", count)
            });
        }
        self.metrics.kubelet_logs_pods_running.set(count);
    }

    pub fn kubelet_logs_pod_running(&self) -> i64 {
        self.read().kubelet_logs_pod_running
    }

    /// Copy every field under a single read lock
    pub fn snapshot(&self) -> StateSnapshot {
        self.read().clone()
    }

    // Every critical section leaves the fields consistent, so a poisoned lock is
    // still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, StateSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StateSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store `new` in `slot`, calling `log` first when it differs from the stored value.
///
/// Returns whether the value changed.
fn log_if_changed<T, U>(slot: &mut T, new: &U, log: impl FnOnce(&U)) -> bool
where
    T: PartialEq<U>,
    U: ToOwned<Owned = T> + ?Sized,
{
    if *slot == *new {
        return false;
    }
    log(new);
    *slot = new.to_owned();
    true
}
