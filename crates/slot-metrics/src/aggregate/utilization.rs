//! Memory and disk actually used by running jobs, summed over every schedd.

use crate::records::JobUsageRecord;
use crate::types::{MetricKey, MetricMap, MetricValue};

/// Running sums of job resource usage across schedds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilizationTotals {
    /// Sum of `ResidentSetSize_RAW`, in KB.
    pub resident_set_size: MetricValue,
    /// Sum of `DiskUsage_RAW`, in KB.
    pub disk_usage: MetricValue,
    /// Number of schedds whose jobs were added.
    pub sources: usize,
}

impl UtilizationTotals {
    /// Creates empty totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the running jobs reported by one schedd.
    pub fn add_source(&mut self, jobs: &[JobUsageRecord]) {
        for job in jobs {
            self.resident_set_size += job.resident_set_size;
            self.disk_usage += job.disk_usage;
        }
        self.sources += 1;
    }

    /// Returns `MemoryUsage` (MB) and `DiskUsage` (KB), or an empty map when
    /// no schedd answered.
    ///
    /// Reporting zeros for an unanswered poll would make an outage look like
    /// an idle pool on the dashboards; an empty map leaves a gap instead. A
    /// schedd that answers with no running jobs does produce zeros.
    #[must_use]
    pub fn into_metrics(self) -> MetricMap {
        let mut metrics = MetricMap::new();
        if self.sources == 0 {
            return metrics;
        }

        let memory_mb = match self.resident_set_size {
            MetricValue::Int(kb) => MetricValue::Int(kb / 1024),
            MetricValue::Float(kb) => MetricValue::Float(kb / 1024.0),
        };
        metrics.set(MetricKey::join(["MemoryUsage"]), memory_mb);
        metrics.set(MetricKey::join(["DiskUsage"]), self.disk_usage);
        metrics
    }
}
