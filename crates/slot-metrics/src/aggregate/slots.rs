//! The slot aggregator: classifies every startd slot and accumulates its
//! capacity under `<SlotType>.*` and `jobs.totals.*` keys.
//!
//! Key layout (positions are stable so consumers can split on `.`):
//!
//! ```text
//! Partitionable.slot.<host>.<field>            per-slot detail (opt-in)
//! <SlotType>.totals.<field>                    type-wide totals
//! <SlotType>.Claimed.<group>.<owner>.<field>   claimed capacity by owner
//! <SlotType>.<State>.<field>                   unclaimed capacity by state
//! jobs.totals.<memory tier>                    running jobs by memory tier
//! ```

use tracing::warn;

use crate::aggregate::RecordAggregator;
use crate::classify::{Classification, accounting_identity, classify, memory_tier, sanitize_segment, slot_hostname};
use crate::records::{SlotField, SlotRecord, SlotState, SlotType};
use crate::types::{MetricKey, MetricMap};

/// Totals of an exhausted partitionable slot; its free capacity is left to
/// the `Dynamic.Unusable` accounting.
const EXHAUSTED_TOTAL_FIELDS: [SlotField; 9] = [
    SlotField::TotalDisk,
    SlotField::TotalSlotDisk,
    SlotField::TotalMemory,
    SlotField::TotalSlotMemory,
    SlotField::TotalCpus,
    SlotField::TotalSlotCpus,
    SlotField::TotalLoadAvg,
    SlotField::LoadAvg,
    SlotField::TotalCondorLoadAvg,
];

/// Totals and free capacity of a partitionable slot that can still take jobs.
const PARTITIONABLE_TOTAL_FIELDS: [SlotField; 12] = [
    SlotField::TotalDisk,
    SlotField::TotalSlotDisk,
    SlotField::Disk,
    SlotField::TotalMemory,
    SlotField::TotalSlotMemory,
    SlotField::Memory,
    SlotField::TotalCpus,
    SlotField::TotalSlotCpus,
    SlotField::Cpus,
    SlotField::TotalLoadAvg,
    SlotField::LoadAvg,
    SlotField::TotalCondorLoadAvg,
];

const DETAIL_FIELDS: [SlotField; 3] = [SlotField::Memory, SlotField::Cpus, SlotField::Disk];

const CLAIMED_FIELDS: [SlotField; 4] = [
    SlotField::Disk,
    SlotField::Memory,
    SlotField::Cpus,
    SlotField::LoadAvg,
];

const STATE_FIELDS: [SlotField; 3] = [SlotField::Disk, SlotField::Memory, SlotField::Cpus];

fn with_gpu(fields: &[SlotField], gpu: Option<SlotField>) -> impl Iterator<Item = SlotField> + '_ {
    fields.iter().copied().chain(gpu)
}

/// Aggregates startd slot records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotAggregator {
    per_slot_detail: bool,
}

impl SlotAggregator {
    /// Creates an aggregator; `per_slot_detail` adds `Partitionable.slot.<host>.*` keys.
    #[must_use]
    pub const fn new(per_slot_detail: bool) -> Self {
        Self { per_slot_detail }
    }

    /// Returns true if per-slot detail keys are produced.
    #[must_use]
    pub const fn per_slot_detail(&self) -> bool {
        self.per_slot_detail
    }

    fn accumulate_partitionable(
        &self,
        record: &SlotRecord,
        exhausted: bool,
        metrics: &mut MetricMap,
    ) {
        let slot_type = "Partitionable";
        let gpu = record.partitionable_gpu_field();

        if self.per_slot_detail {
            let name = record.name.as_deref().unwrap_or("undefined");
            match slot_hostname(name) {
                Some(host) => {
                    for field in with_gpu(&DETAIL_FIELDS, gpu) {
                        metrics.add(
                            MetricKey::join([slot_type, "slot", host, field.as_str()]),
                            record.field(field),
                        );
                    }
                }
                None => warn!(name = %name, "malformed slot name, skipping per-slot detail"),
            }
        }

        let fields: &[SlotField] = if exhausted {
            &EXHAUSTED_TOTAL_FIELDS
        } else {
            &PARTITIONABLE_TOTAL_FIELDS
        };
        for field in with_gpu(fields, gpu) {
            metrics.add(
                MetricKey::join([slot_type, "totals", field.as_str()]),
                record.field(field),
            );
        }
    }

    fn accumulate_claimed(record: &SlotRecord, slot_type: &SlotType, metrics: &mut MetricMap) {
        let slot_type = slot_type.as_str();
        let state = "Claimed";
        let identity = accounting_identity(record);
        let group = sanitize_segment(&identity.group);
        let owner = sanitize_segment(&identity.owner);
        let (group, owner) = (group.as_str(), owner.as_str());

        for field in with_gpu(&CLAIMED_FIELDS, record.dynamic_gpu_field()) {
            let value = record.field(field);
            metrics.add(
                MetricKey::join([slot_type, state, group, owner, field.as_str()]),
                value,
            );
            metrics.add(MetricKey::join([slot_type, "totals", field.as_str()]), value);
        }

        metrics.add(
            MetricKey::join([slot_type, state, group, owner, "Weighted"]),
            record.slot_weight.unwrap_or_default(),
        );
        metrics.increment(MetricKey::join([slot_type, state, group, owner, "NumSlots"]));
        let tier = memory_tier(record.memory.as_i64());
        metrics.increment(MetricKey::join(["jobs", "totals", tier.as_str()]));
    }

    fn accumulate_by_state(record: &SlotRecord, class: &Classification, metrics: &mut MetricMap) {
        let slot_type = class.slot_type.as_str();
        let state = class.state.as_str();

        for field in with_gpu(&STATE_FIELDS, record.dynamic_gpu_field()) {
            let value = record.field(field);
            metrics.add(MetricKey::join([slot_type, state, field.as_str()]), value);
            metrics.add(MetricKey::join([slot_type, "totals", field.as_str()]), value);
        }
        metrics.increment(MetricKey::join([slot_type, state, "NumSlots"]));
    }
}

impl RecordAggregator for SlotAggregator {
    type Record = SlotRecord;

    /// Partitionable slots first contribute their totals. The claimed and
    /// per-state branches then look at the effective classification, so an
    /// exhausted partitionable slot also shows up as `Dynamic.Unusable`,
    /// while a partitionable slot with free capacity that is not claimed
    /// contributes nothing beyond its totals.
    fn accumulate(&self, record: &SlotRecord, metrics: &mut MetricMap) {
        let class = classify(record);

        if record.slot_type() == SlotType::Partitionable {
            self.accumulate_partitionable(record, class.exhausted, metrics);
        }

        if class.state == SlotState::Claimed {
            Self::accumulate_claimed(record, &class.slot_type, metrics);
        } else if class.slot_type != SlotType::Partitionable {
            Self::accumulate_by_state(record, &class, metrics);
        }
    }

    fn name(&self) -> &'static str {
        "SlotAggregator"
    }
}
