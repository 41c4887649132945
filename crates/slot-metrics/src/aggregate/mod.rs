//! Aggregators that fold typed records into a [`MetricMap`].
//!
//! Each aggregator is a pure function of its input batch: no I/O, no retries,
//! no shared state. The fetch-then-aggregate orchestration lives in
//! [`crate::collector`].

mod drain;
mod glideins;
mod slots;
mod utilization;

pub use drain::drain_metrics;
pub use glideins::{GLIDEIN_FRESHNESS_SECS, GlideinAggregator};
pub use slots::SlotAggregator;
pub use utilization::UtilizationTotals;

use crate::types::MetricMap;

/// Folds records of one kind into a metric map.
///
/// Implementations only ever add to the map, so aggregating two disjoint
/// batches and merging the results with [`MetricMap::merge_sum`] gives the
/// same map as aggregating their union.
pub trait RecordAggregator {
    /// The record type this aggregator consumes.
    type Record;

    /// Adds one record's contributions to `metrics`.
    fn accumulate(&self, record: &Self::Record, metrics: &mut MetricMap);

    /// Returns the name of this aggregator for logging purposes.
    fn name(&self) -> &'static str;

    /// Aggregates a whole batch into a fresh map.
    fn aggregate<'a, I>(&self, records: I) -> MetricMap
    where
        I: IntoIterator<Item = &'a Self::Record>,
        Self::Record: 'a,
    {
        let mut metrics = MetricMap::new();
        for record in records {
            self.accumulate(record, &mut metrics);
        }
        metrics
    }
}
