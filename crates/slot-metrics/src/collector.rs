//! Pool collection entry points.
//!
//! Every entry point makes its round trips through a [`RetryingFetcher`],
//! decodes the ads into typed records and runs them through the matching
//! aggregator. Transport failures never reach the caller: once the retries
//! are exhausted the entry point logs and returns an empty map.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::aggregate::{GlideinAggregator, RecordAggregator, SlotAggregator, UtilizationTotals, drain_metrics};
use crate::config::PollConfig;
use crate::query::Query;
use crate::records::{Ad, DrainRecord, GlideinRecord, JobUsageRecord, SlotRecord, decode_ad};
use crate::retry::{RetryPolicy, RetryingFetcher};
use crate::source::AdSource;
use crate::types::{MetricKey, MetricMap};

/// Decodes a batch of ads, skipping the ones with mistyped attributes.
fn decode_all<T: DeserializeOwned>(ads: &[Ad], kind: &'static str) -> Vec<T> {
    ads.iter()
        .filter_map(|ad| match decode_ad(ad) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(kind, error = %e, "skipping malformed ad");
                None
            }
        })
        .collect()
}

/// Collects metrics for one pool.
#[derive(Debug, Clone)]
pub struct PoolCollector<S> {
    fetcher: RetryingFetcher<S>,
    pool: String,
    per_slot_detail: bool,
    now: Option<DateTime<Utc>>,
}

impl<S: AdSource> PoolCollector<S> {
    /// Creates a collector for `pool` with the given retry policy.
    #[must_use]
    pub fn new(source: S, pool: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            fetcher: RetryingFetcher::new(source, policy),
            pool: pool.into(),
            per_slot_detail: false,
            now: None,
        }
    }

    /// Creates a collector from a poll configuration.
    #[must_use]
    pub fn from_config(source: S, config: &PollConfig) -> Self {
        Self::new(source, config.pool_name(), config.retry_policy())
            .with_per_slot_detail(config.per_slot_detail)
    }

    /// Enables `Partitionable.slot.<host>.*` keys.
    #[must_use]
    pub fn with_per_slot_detail(mut self, enabled: bool) -> Self {
        self.per_slot_detail = enabled;
        self
    }

    /// Pins the poll time instead of reading the system clock.
    #[must_use]
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Returns the pool this collector polls.
    #[must_use]
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Returns the underlying ad source.
    #[must_use]
    pub const fn source(&self) -> &S {
        self.fetcher.source()
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn fetch(&self, query: &Query) -> Option<Vec<Ad>> {
        debug!(pool = %self.pool, query = %query, source = self.fetcher.source().name(), "querying pool");
        self.fetcher.fetch(&self.pool, query).ok()
    }

    /// Republishes the drain daemon's statistics.
    ///
    /// Empty when the fetch fails, the pool does not answer with exactly one
    /// drain ad, or that ad does not decode. The count is taken on the raw
    /// ads, so a malformed second daemon still voids the result.
    #[must_use]
    pub fn defrag_info(&self) -> MetricMap {
        let Some(ads) = self.fetch(&Query::defrag()) else {
            return MetricMap::new();
        };
        let [ad] = ads.as_slice() else {
            if !ads.is_empty() {
                warn!(pool = %self.pool, count = ads.len(), "expected one drain ad, ignoring all");
            }
            return MetricMap::new();
        };
        match decode_ad::<DrainRecord>(ad) {
            Ok(record) => drain_metrics(std::slice::from_ref(&record)),
            Err(e) => {
                warn!(pool = %self.pool, error = %e, "skipping malformed drain ad");
                MetricMap::new()
            }
        }
    }

    /// Aggregates every startd slot and folds in job resource usage.
    ///
    /// An empty pool yields an empty map without asking the schedds.
    #[must_use]
    pub fn pool_slots(&self) -> MetricMap {
        let Some(ads) = self.fetch(&Query::startd_slots()) else {
            return MetricMap::new();
        };
        let records: Vec<SlotRecord> = decode_all(&ads, "startd");

        let aggregator = SlotAggregator::new(self.per_slot_detail);
        let mut metrics = aggregator.aggregate(&records);
        if metrics.is_empty() {
            return metrics;
        }

        let usage = self.resource_utilization();
        let jobs_totals = MetricKey::join(["jobs", "totals"]);
        metrics.merge_overwrite(usage.with_prefix(&jobs_totals));

        info!(pool = %self.pool, slots = records.len(), keys = metrics.len(), "collected slot metrics");
        metrics
    }

    /// Aggregates the pool's glidein slots.
    #[must_use]
    pub fn glidein_slots(&self) -> MetricMap {
        let Some(ads) = self.fetch(&Query::glidein_slots()) else {
            return MetricMap::new();
        };
        let records: Vec<GlideinRecord> = decode_all(&ads, "glidein");
        let metrics = GlideinAggregator::new(self.now()).aggregate(&records);
        info!(pool = %self.pool, glideins = records.len(), keys = metrics.len(), "collected glidein metrics");
        metrics
    }

    /// Sums memory and disk used by running jobs over every schedd.
    ///
    /// A schedd that cannot be queried is logged and left out. The map is
    /// empty, not zero, when no schedd could be located or none answered;
    /// see [`UtilizationTotals::into_metrics`].
    #[must_use]
    pub fn resource_utilization(&self) -> MetricMap {
        let Ok(schedds) = self.fetcher.locate_schedds(&self.pool) else {
            return MetricMap::new();
        };

        let query = Query::running_jobs();
        let mut totals = UtilizationTotals::new();
        for schedd in &schedds {
            match self.fetcher.query_schedd(schedd, &query) {
                Ok(ads) => {
                    let jobs: Vec<JobUsageRecord> = decode_all(&ads, "job");
                    debug!(schedd = %schedd, jobs = jobs.len(), "queried schedd");
                    totals.add_source(&jobs);
                }
                Err(e) => error!(pool = %self.pool, schedd = %schedd, error = %e, "schedd query failed"),
            }
        }

        if totals.sources < schedds.len() {
            warn!(
                pool = %self.pool,
                answered = totals.sources,
                located = schedds.len(),
                "some schedds did not answer"
            );
        }
        totals.into_metrics()
    }

    /// Runs the drain, slot (with utilization) and glidein collections and
    /// merges their maps; their key spaces do not overlap.
    #[must_use]
    pub fn collect_all(&self) -> MetricMap {
        let mut metrics = self.defrag_info();
        metrics.merge_overwrite(self.pool_slots());
        metrics.merge_overwrite(self.glidein_slots());
        metrics
    }
}

/// Republishes the drain daemon's statistics for `pool`.
#[must_use]
pub fn get_defrag_info<S: AdSource>(
    source: S,
    pool: &str,
    retry_delay: Duration,
    max_retries: u32,
) -> MetricMap {
    PoolCollector::new(source, pool, RetryPolicy::new(retry_delay, max_retries)).defrag_info()
}

/// Aggregates every startd slot of `pool`.
#[must_use]
pub fn get_pool_slots<S: AdSource>(
    source: S,
    pool: &str,
    retry_delay: Duration,
    max_retries: u32,
    per_slot_detail: bool,
) -> MetricMap {
    PoolCollector::new(source, pool, RetryPolicy::new(retry_delay, max_retries))
        .with_per_slot_detail(per_slot_detail)
        .pool_slots()
}

/// Aggregates the glidein slots of `pool`.
#[must_use]
pub fn get_pool_glidein_slots<S: AdSource>(
    source: S,
    pool: &str,
    retry_delay: Duration,
    max_retries: u32,
) -> MetricMap {
    PoolCollector::new(source, pool, RetryPolicy::new(retry_delay, max_retries)).glidein_slots()
}

/// Sums job resource usage over the schedds of `pool`.
#[must_use]
pub fn get_pool_resource_utilization<S: AdSource>(
    source: S,
    pool: &str,
    retry_delay: Duration,
    max_retries: u32,
) -> MetricMap {
    PoolCollector::new(source, pool, RetryPolicy::new(retry_delay, max_retries))
        .resource_utilization()
}
