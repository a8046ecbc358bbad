//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::fmt::Write;

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Pool, PoolConfiguration, Poolable};
///
/// struct Bullet;
/// impl Poolable for Bullet {}
///
/// let mut pool = Pool::new("", PoolConfiguration::new()).unwrap();
/// let key = pool.register(Bullet, false);
/// assert_eq!(pool.borrow(""), Some(key));
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_registered, 1);
/// assert_eq!(metrics.total_borrowed, 1);
/// assert_eq!(metrics.in_use_entries, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Total entries registered
    pub total_registered: usize,

    /// Total successful borrows
    pub total_borrowed: usize,

    /// Borrows that found no eligible entry
    pub borrow_misses: usize,

    /// Total successful returns
    pub total_returned: usize,

    /// Returns rejected because the entry was not borrowed
    pub double_returns: usize,

    /// Entries evicted by trim passes or explicit eviction
    pub total_evicted: usize,

    /// Evictions that happened because the entry had expired
    pub expired_evictions: usize,

    /// Teardown hooks that reported an error
    pub teardown_faults: usize,

    /// Trim passes run
    pub trim_passes: usize,

    /// Current entry count
    pub entries: usize,

    /// Current entries with a borrow outstanding
    pub in_use_entries: usize,

    /// Configured capacity, `None` when unbounded
    pub capacity: Option<usize>,

    /// Entries relative to capacity; 0.0 when unbounded
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_registered".to_string(), self.total_registered.to_string());
        metrics.insert("total_borrowed".to_string(), self.total_borrowed.to_string());
        metrics.insert("borrow_misses".to_string(), self.borrow_misses.to_string());
        metrics.insert("total_returned".to_string(), self.total_returned.to_string());
        metrics.insert("double_returns".to_string(), self.double_returns.to_string());
        metrics.insert("total_evicted".to_string(), self.total_evicted.to_string());
        metrics.insert("expired_evictions".to_string(), self.expired_evictions.to_string());
        metrics.insert("teardown_faults".to_string(), self.teardown_faults.to_string());
        metrics.insert("trim_passes".to_string(), self.trim_passes.to_string());
        metrics.insert("entries".to_string(), self.entries.to_string());
        metrics.insert("in_use_entries".to_string(), self.in_use_entries.to_string());
        metrics.insert(
            "capacity".to_string(),
            self.capacity.map_or_else(|| "unbounded".to_string(), |c| c.to_string()),
        );
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

type Family = (&'static str, &'static str, &'static str, fn(&PoolMetrics) -> f64);

const FAMILIES: [Family; 12] = [
    ("resourcepool_entries", "Current pooled entries", "gauge", |m| m.entries as f64),
    ("resourcepool_entries_in_use", "Current borrowed entries", "gauge", |m| m.in_use_entries as f64),
    ("resourcepool_utilization", "Entries relative to capacity", "gauge", |m| m.utilization),
    ("resourcepool_registered_total", "Total entries registered", "counter", |m| m.total_registered as f64),
    ("resourcepool_borrowed_total", "Total successful borrows", "counter", |m| m.total_borrowed as f64),
    ("resourcepool_borrow_misses_total", "Borrows with no eligible entry", "counter", |m| m.borrow_misses as f64),
    ("resourcepool_returned_total", "Total successful returns", "counter", |m| m.total_returned as f64),
    ("resourcepool_double_returns_total", "Returns without a matching borrow", "counter", |m| m.double_returns as f64),
    ("resourcepool_evicted_total", "Total entries evicted", "counter", |m| m.total_evicted as f64),
    ("resourcepool_expired_total", "Entries evicted on expiry", "counter", |m| m.expired_evictions as f64),
    ("resourcepool_teardown_faults_total", "Teardown hooks that failed", "counter", |m| m.teardown_faults as f64),
    ("resourcepool_trim_passes_total", "Trim passes run", "counter", |m| m.trim_passes as f64),
];

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("scene".to_string(), "arena".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&PoolMetrics::default(), "Bullet", "", Some(&tags));
    /// assert!(output.contains("resourcepool_entries"));
    /// assert!(output.contains("scene=\"arena\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        kind: &str,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        Self::export_prometheus_many(&[(metrics, kind, pool_name)], tags)
    }

    /// Export several pools, grouping samples by metric family
    pub fn export_prometheus_many(
        samples: &[(&PoolMetrics, &str, &str)],
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels: Vec<String> = samples
            .iter()
            .map(|(_, kind, pool_name)| Self::format_labels(kind, pool_name, tags))
            .collect();

        for (name, help, kind, value) in FAMILIES {
            let _ = writeln!(output, "# HELP {name} {help}");
            let _ = writeln!(output, "# TYPE {name} {kind}");
            for ((metrics, _, _), labels) in samples.iter().zip(&labels) {
                let _ = writeln!(output, "{name}{{{labels}}} {}", value(metrics));
            }
        }

        output
    }

    fn format_labels(kind: &str, pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![
            format!("kind=\"{}\"", escape_label(kind)),
            format!("pool=\"{}\"", escape_label(pool_name)),
        ];

        if let Some(tags) = tags {
            let mut tags: Vec<_> = tags.iter().collect();
            tags.sort();
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, escape_label(value)));
            }
        }

        labels.join(",")
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_registered: usize,
    pub total_borrowed: usize,
    pub borrow_misses: usize,
    pub total_returned: usize,
    pub double_returns: usize,
    pub total_evicted: usize,
    pub expired_evictions: usize,
    pub teardown_faults: usize,
    pub trim_passes: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, entries: usize, in_use: usize, capacity: Option<usize>) -> PoolMetrics {
        let utilization = match capacity {
            Some(capacity) if capacity > 0 => entries as f64 / capacity as f64,
            _ => 0.0,
        };

        PoolMetrics {
            total_registered: self.total_registered,
            total_borrowed: self.total_borrowed,
            borrow_misses: self.borrow_misses,
            total_returned: self.total_returned,
            double_returns: self.double_returns,
            total_evicted: self.total_evicted,
            expired_evictions: self.expired_evictions,
            teardown_faults: self.teardown_faults,
            trim_passes: self.trim_passes,
            entries,
            in_use_entries: in_use,
            capacity,
            utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization() {
        let tracker = MetricsTracker::new();
        assert_eq!(tracker.get_metrics(3, 1, Some(4)).utilization, 0.75);
        assert_eq!(tracker.get_metrics(3, 1, None).utilization, 0.0);
        assert_eq!(tracker.get_metrics(3, 1, Some(0)).utilization, 0.0);
    }

    #[test]
    fn test_export_map() {
        let mut tracker = MetricsTracker::new();
        tracker.total_evicted = 4;
        let exported = tracker.get_metrics(2, 0, None).export();
        assert_eq!(exported["total_evicted"], "4");
        assert_eq!(exported["capacity"], "unbounded");
    }

    #[test]
    fn test_prometheus_labels_are_escaped() {
        let output = MetricsExporter::export_prometheus(
            &PoolMetrics::default(),
            "Bullet",
            "say \"hi\"",
            None,
        );
        assert!(output.contains("pool=\"say \\\"hi\\\"\""));
        assert!(output.contains("# TYPE resourcepool_evicted_total counter"));
    }
}
