//! Republishes the drain daemon's statistics.

use tracing::warn;

use crate::records::DrainRecord;
use crate::types::{MetricKey, MetricMap};

/// Copies the advertised drain statistics into a map.
///
/// A pool runs at most one drain daemon; with zero or several ads there is
/// nothing trustworthy to report and the map is empty. Attributes the daemon
/// did not advertise are left out.
#[must_use]
pub fn drain_metrics(records: &[DrainRecord]) -> MetricMap {
    let mut metrics = MetricMap::new();

    let [record] = records else {
        if records.len() > 1 {
            warn!(count = records.len(), "expected one drain ad, ignoring all");
        }
        return metrics;
    };

    for (name, value) in record.fields() {
        if let Some(value) = value {
            metrics.set(MetricKey::join([name]), value);
        }
    }
    metrics
}
