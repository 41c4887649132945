//! Glidein slots, accounted by site and resource under `glideins.*`.

use chrono::{DateTime, Utc};

use crate::aggregate::RecordAggregator;
use crate::classify::user_part;
use crate::records::{GlideinRecord, SlotState};
use crate::types::{MetricKey, MetricMap, MetricValue};

/// A glidein whose daemon started less than this many seconds ago is `New`.
pub const GLIDEIN_FRESHNESS_SECS: i64 = 300;

const ROOT: &str = "glideins";

/// Aggregates glidein records relative to a fixed poll time.
#[derive(Debug, Clone, Copy)]
pub struct GlideinAggregator {
    now: DateTime<Utc>,
}

impl GlideinAggregator {
    /// Creates an aggregator that judges freshness against `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Returns the poll time freshness is judged against.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Returns the state a glidein is accounted under.
    ///
    /// Age is compared in fractional seconds; a glidein without a start time
    /// counts as started at poll time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn effective_state(&self, record: &GlideinRecord) -> SlotState {
        let now_secs = self.now.timestamp_millis() as f64 / 1000.0;
        let started_secs = record.daemon_start_time.unwrap_or(now_secs);

        if now_secs - started_secs < GLIDEIN_FRESHNESS_SECS as f64 {
            SlotState::New
        } else {
            record.state.clone().unwrap_or_default()
        }
    }
}

impl Default for GlideinAggregator {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl RecordAggregator for GlideinAggregator {
    type Record = GlideinRecord;

    fn accumulate(&self, record: &GlideinRecord, metrics: &mut MetricMap) {
        let state = self.effective_state(record);
        let (site, resource) = (record.site(), record.resource());

        let prefixes = [
            MetricKey::join([ROOT, "totals"]),
            MetricKey::join([ROOT, state.as_str(), "totals"]),
            MetricKey::join([ROOT, state.as_str(), "sites", site, "totals"]),
            MetricKey::join([ROOT, state.as_str(), "sites", site, "resources", resource]),
        ];
        let fields: [(&str, MetricValue); 3] = [
            ("Disk", record.disk),
            ("Memory", record.memory),
            ("Cpus", record.cpus),
        ];

        for prefix in &prefixes {
            metrics.increment(MetricKey::join([prefix.as_str(), "NumSlots"]));
            for (field, value) in fields {
                metrics.add(MetricKey::join([prefix.as_str(), field]), value);
            }
        }

        if matches!(state, SlotState::Claimed | SlotState::New) {
            let owner = record.remote_owner.as_deref().map_or("Unknown", user_part);
            let claimed = [
                ("Disk", record.disk),
                ("Memory", record.memory),
                ("Cpus", record.cpus),
                ("LoadAvg", record.load_avg),
            ];
            for (field, value) in claimed {
                metrics.add(MetricKey::join([ROOT, "Claimed", "owner", owner, field]), value);
            }
        }
    }

    fn name(&self) -> &'static str {
        "GlideinAggregator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NOW_SECS: i64 = 1_700_000_000;

    fn aggregator() -> GlideinAggregator {
        GlideinAggregator::new(Utc.timestamp_opt(NOW_SECS, 0).single().unwrap_or_default())
    }

    #[allow(clippy::cast_precision_loss)]
    fn glidein(state: SlotState, age_secs: i64) -> GlideinRecord {
        GlideinRecord {
            site: Some("T2_US_Nebraska".to_string()),
            resource_name: Some("Nebraska_CE".to_string()),
            state: Some(state),
            daemon_start_time: Some((NOW_SECS - age_secs) as f64),
            disk: MetricValue::Int(1000),
            memory: MetricValue::Int(2500),
            cpus: MetricValue::Int(1),
            load_avg: MetricValue::Float(0.5),
            remote_owner: Some("carol@submit.example".to_string()),
            ..GlideinRecord::default()
        }
    }

    fn int(metrics: &MetricMap, key: &str) -> i64 {
        metrics
            .get(key)
            .unwrap_or_else(|| panic!("missing key {key}"))
            .as_i64()
    }

    mod freshness {
        use super::*;

        #[test]
        fn young_glidein_is_new() {
            let state = aggregator().effective_state(&glidein(SlotState::Unclaimed, 100));
            assert_eq!(state, SlotState::New);
        }

        #[test]
        fn old_glidein_keeps_reported_state() {
            let state = aggregator().effective_state(&glidein(SlotState::Unclaimed, 301));
            assert_eq!(state, SlotState::Unclaimed);
        }

        #[test]
        fn exactly_window_age_is_not_new() {
            let state = aggregator().effective_state(&glidein(SlotState::Claimed, 300));
            assert_eq!(state, SlotState::Claimed);
        }

        #[test]
        #[allow(clippy::cast_precision_loss)]
        fn fractional_age_just_under_window_is_new() {
            let mut record = glidein(SlotState::Unclaimed, 0);
            record.daemon_start_time = Some(NOW_SECS as f64 - 299.9995);
            assert_eq!(aggregator().effective_state(&record), SlotState::New);
        }

        #[test]
        fn missing_start_time_is_new() {
            let mut record = glidein(SlotState::Claimed, 1000);
            record.daemon_start_time = None;
            assert_eq!(aggregator().effective_state(&record), SlotState::New);
        }

        #[test]
        fn missing_state_is_unknown() {
            let mut record = glidein(SlotState::Claimed, 1000);
            record.state = None;
            assert_eq!(aggregator().effective_state(&record), SlotState::Unknown);
        }
    }

    #[test]
    fn unclaimed_glidein_keys() {
        let metrics = aggregator().aggregate([&glidein(SlotState::Unclaimed, 1000)]);

        assert_eq!(int(&metrics, "glideins.totals.NumSlots"), 1);
        assert_eq!(int(&metrics, "glideins.totals.Memory"), 2500);
        assert_eq!(int(&metrics, "glideins.Unclaimed.totals.Cpus"), 1);
        assert_eq!(
            int(&metrics, "glideins.Unclaimed.sites.T2_US_Nebraska.totals.Disk"),
            1000
        );
        assert_eq!(
            int(
                &metrics,
                "glideins.Unclaimed.sites.T2_US_Nebraska.resources.Nebraska_CE.NumSlots"
            ),
            1
        );
        assert_eq!(metrics.keys_under("glideins.Claimed").count(), 0);
        assert_eq!(metrics.len(), 16);
    }

    #[test]
    fn new_glidein_folds_into_claimed_owner() {
        let metrics = aggregator().aggregate([&glidein(SlotState::Unclaimed, 10)]);

        assert_eq!(int(&metrics, "glideins.New.totals.NumSlots"), 1);
        assert_eq!(int(&metrics, "glideins.New.sites.T2_US_Nebraska.totals.NumSlots"), 1);
        assert_eq!(int(&metrics, "glideins.Claimed.owner.carol.Memory"), 2500);
        assert_eq!(
            metrics.get("glideins.Claimed.owner.carol.LoadAvg"),
            Some(MetricValue::Float(0.5))
        );
        assert!(!metrics.contains_key("glideins.Unclaimed.totals.NumSlots"));
    }

    #[test]
    fn claimed_glideins_sum_per_owner() {
        let a = glidein(SlotState::Claimed, 1000);
        let b = glidein(SlotState::Claimed, 2000);
        let mut c = glidein(SlotState::Claimed, 3000);
        c.remote_owner = None;
        let metrics = aggregator().aggregate([&a, &b, &c]);

        assert_eq!(int(&metrics, "glideins.Claimed.owner.carol.Cpus"), 2);
        assert_eq!(int(&metrics, "glideins.Claimed.owner.Unknown.Cpus"), 1);
        assert_eq!(int(&metrics, "glideins.Claimed.totals.NumSlots"), 3);
    }

    #[test]
    fn labels_default_to_unknown() {
        let mut record = glidein(SlotState::Unclaimed, 1000);
        record.site = None;
        record.resource_name = None;
        let metrics = aggregator().aggregate([&record]);
        assert_eq!(
            int(
                &metrics,
                "glideins.Unclaimed.sites.Unknown.resources.Unknown.NumSlots"
            ),
            1
        );
    }

    #[test]
    fn legacy_resource_name_is_used() {
        let mut record = glidein(SlotState::Unclaimed, 1000);
        record.resource_name = None;
        record.legacy_resource_name = Some("Old_CE".to_string());
        let metrics = aggregator().aggregate([&record]);
        assert!(
            metrics.contains_key("glideins.Unclaimed.sites.T2_US_Nebraska.resources.Old_CE.Cpus")
        );
    }
}
