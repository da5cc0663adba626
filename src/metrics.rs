//! Prometheus metrics registry for kubelift
//!
//! prometheus-client's [`Registry`] happily accepts the same metric name twice and
//! then exposes both, so [`MetricsRegistry`] keeps the set of names it has handed
//! out and refuses a second registration with [`Error::Registration`].
//!
//! # Exported metrics
//! - `kubelift_version` (gauge): always 1 once the state is built.
//! - `kubelift_ready` (gauge): 1 once the cluster has been marked ready.
//! - `kubelift_kubelet_api_pods_running` (gauge): running pods reported by the kubelet API.
//! - `kubelift_kubelet_logs_pods_running` (gauge): running pods found in the kubelet logs.
//! - `kubelift_kubelet_probe_failures_total` (counter): failed kubelet probes.
//! - `kubelift_dns_failures_total` (counter): failed DNS queries.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

use crate::{Error, Result};

/// Process-global metrics registry
pub static REGISTRY: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::default);

#[derive(Debug, Default)]
struct Inner {
    registry: Registry,
    names: HashSet<String>,
}

/// A prometheus-client registry that rejects duplicate metric names
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
}

impl MetricsRegistry {
    /// Register a group of metrics as a unit.
    ///
    /// `names` must list every name `register` adds. Nothing is registered when one
    /// of them is already taken (or listed twice), so a failed call leaves the
    /// registry untouched.
    pub fn register_group<F>(&self, names: &[&str], register: F) -> Result<()>
    where
        F: FnOnce(&mut Registry),
    {
        let mut inner = self.lock();

        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if inner.names.contains(*name) || !seen.insert(*name) {
                return Err(Error::Registration {
                    name: (*name).to_string(),
                });
            }
        }

        inner.names.extend(names.iter().map(|n| n.to_string()));
        register(&mut inner.registry);
        Ok(())
    }

    /// Whether a metric name has been handed out
    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().names.contains(name)
    }

    /// Encode every registered metric in the OpenMetrics text format
    pub fn encode(&self) -> Result<String> {
        let inner = self.lock();
        let mut buffer = String::new();
        encode(&mut buffer, &inner.registry)?;
        Ok(buffer)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use prometheus_client::metrics::gauge::Gauge;

    use super::*;

    #[test]
    fn test_register_group_and_encode() {
        let registry = MetricsRegistry::default();
        let gauge: Gauge = Gauge::default();
        gauge.set(7);

        registry
            .register_group(&["test_gauge"], |r| {
                r.register("test_gauge", "A test gauge", gauge.clone())
            })
            .unwrap();

        assert!(registry.is_registered("test_gauge"));
        let text = registry.encode().unwrap();
        assert!(text.contains("test_gauge 7"), "unexpected exposition: {text}");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let registry = MetricsRegistry::default();
        registry
            .register_group(&["dup"], |r| r.register("dup", "first", Gauge::<i64>::default()))
            .unwrap();

        let mut called = false;
        let err = registry
            .register_group(&["other", "dup"], |_| called = true)
            .unwrap_err();

        assert!(matches!(err, Error::Registration { ref name } if name == "dup"));
        assert!(!called);
        assert!(!registry.is_registered("other"));
    }

    #[test]
    fn test_name_listed_twice_is_rejected() {
        let registry = MetricsRegistry::default();
        let err = registry.register_group(&["twice", "twice"], |_| {}).unwrap_err();
        assert!(matches!(err, Error::Registration { .. }));
        assert!(!registry.is_registered("twice"));
    }
}
