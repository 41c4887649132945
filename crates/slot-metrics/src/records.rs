//! Typed records decoded from the resource manager's ads.
//!
//! Ads arrive as JSON objects (the manager's JSON ad form). Every attribute
//! the aggregators read is an explicit field here: optional attributes are
//! `Option`s, numeric capacities default to zero when absent or null.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{MetricsError, Result};
use crate::types::MetricValue;

/// A raw ad as returned by an ad source.
pub type Ad = serde_json::Map<String, serde_json::Value>;

/// Decodes a raw ad into a typed record.
///
/// # Errors
///
/// Returns `MetricsError::MalformedAd` if a present attribute has the wrong type.
pub fn decode_ad<T: DeserializeOwned>(ad: &Ad) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(ad.clone())).map_err(|e| {
        MetricsError::MalformedAd {
            reason: e.to_string(),
        }
    })
}

fn zero_if_null<'de, D>(deserializer: D) -> std::result::Result<MetricValue, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<MetricValue>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a number, or `None` for anything else. The manager ships some
/// attributes as unevaluated expressions (`"\/Expr(Cpus)\/"`); those must
/// not cost the whole record.
fn number_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<MetricValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Number(_) => Ok(serde_json::from_value(value).ok()),
        other => {
            warn!(value = %other, "ignoring non-numeric attribute");
            Ok(None)
        }
    }
}

/// How a slot's capacity is allocated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    /// A fixed slot with its own capacity.
    #[default]
    Static,
    /// A slot whose capacity is carved into dynamic slots.
    Partitionable,
    /// A sub-allocation of a partitionable slot.
    Dynamic,
    /// Any other type the manager reports, kept verbatim.
    Other(String),
}

impl SlotType {
    /// Returns the label used in metric keys.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "Static",
            Self::Partitionable => "Partitionable",
            Self::Dynamic => "Dynamic",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SlotType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Static" => Self::Static,
            "Partitionable" => Self::Partitionable,
            "Dynamic" => Self::Dynamic,
            _ => Self::Other(s),
        }
    }
}

impl From<SlotType> for String {
    fn from(t: SlotType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for SlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The allocation state of a slot.
///
/// `Unusable` is assigned to exhausted partitionable slots and `New` to
/// freshly started glideins; neither is reported by the manager itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotState {
    /// Running a job.
    Claimed,
    /// Idle and available.
    Unclaimed,
    /// Reserved by the machine owner.
    Owner,
    /// Matched to a job but not yet claimed.
    Matched,
    /// Evicting its current job.
    Preempting,
    /// Running backfill work.
    Backfill,
    /// Drained and not accepting jobs.
    Drained,
    /// Remaining capacity is too small to run anything.
    Unusable,
    /// A glidein younger than the freshness window.
    New,
    /// The state attribute was missing.
    #[default]
    Unknown,
    /// Any other state the manager reports, kept verbatim.
    Other(String),
}

impl SlotState {
    /// Returns the label used in metric keys.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Claimed => "Claimed",
            Self::Unclaimed => "Unclaimed",
            Self::Owner => "Owner",
            Self::Matched => "Matched",
            Self::Preempting => "Preempting",
            Self::Backfill => "Backfill",
            Self::Drained => "Drained",
            Self::Unusable => "Unusable",
            Self::New => "New",
            Self::Unknown => "Unknown",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SlotState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Claimed" => Self::Claimed,
            "Unclaimed" => Self::Unclaimed,
            "Owner" => Self::Owner,
            "Matched" => Self::Matched,
            "Preempting" => Self::Preempting,
            "Backfill" => Self::Backfill,
            "Drained" => Self::Drained,
            "Unusable" => Self::Unusable,
            "New" => Self::New,
            "Unknown" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl From<SlotState> for String {
    fn from(s: SlotState) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric slot attribute that can be accumulated into a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SlotField {
    Cpus,
    TotalSlotCpus,
    TotalCpus,
    Disk,
    TotalSlotDisk,
    TotalDisk,
    Memory,
    TotalSlotMemory,
    TotalMemory,
    LoadAvg,
    TotalCondorLoadAvg,
    TotalLoadAvg,
    Gpus,
    TotalSlotGpus,
}

impl SlotField {
    /// Returns the attribute name, which is also the last segment of its metric key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpus => "Cpus",
            Self::TotalSlotCpus => "TotalSlotCpus",
            Self::TotalCpus => "TotalCpus",
            Self::Disk => "Disk",
            Self::TotalSlotDisk => "TotalSlotDisk",
            Self::TotalDisk => "TotalDisk",
            Self::Memory => "Memory",
            Self::TotalSlotMemory => "TotalSlotMemory",
            Self::TotalMemory => "TotalMemory",
            Self::LoadAvg => "LoadAvg",
            Self::TotalCondorLoadAvg => "TotalCondorLoadAvg",
            Self::TotalLoadAvg => "TotalLoadAvg",
            Self::Gpus => "Gpus",
            Self::TotalSlotGpus => "TotalSlotGpus",
        }
    }
}

/// One slot as advertised by a startd.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct SlotRecord {
    pub slot_type: Option<SlotType>,
    pub state: Option<SlotState>,
    /// `slot<N>@<host>` style slot name.
    pub name: Option<String>,
    /// Evaluated value of the slot's weight expression; `None` when the ad
    /// carries the expression itself.
    #[serde(deserialize_with = "number_or_none")]
    pub slot_weight: Option<MetricValue>,
    #[serde(deserialize_with = "zero_if_null")]
    pub cpus: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_slot_cpus: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_cpus: MetricValue,
    /// KB.
    #[serde(deserialize_with = "zero_if_null")]
    pub disk: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_slot_disk: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_disk: MetricValue,
    /// MB.
    #[serde(deserialize_with = "zero_if_null")]
    pub memory: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_slot_memory: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_memory: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub load_avg: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_condor_load_avg: MetricValue,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_load_avg: MetricValue,
    pub gpus: Option<MetricValue>,
    pub total_slot_gpus: Option<MetricValue>,
    /// `group_<group>.<owner>@<domain>` when the job runs under an accounting group.
    pub accounting_group: Option<String>,
    pub remote_group: Option<String>,
    /// `<owner>@<domain>` of the job's submitter.
    pub remote_owner: Option<String>,
}

impl SlotRecord {
    /// Creates a record with the given type and state and zero capacity.
    #[must_use]
    pub fn new(slot_type: SlotType, state: SlotState) -> Self {
        Self {
            slot_type: Some(slot_type),
            state: Some(state),
            ..Self::default()
        }
    }

    /// Returns the reported slot type, defaulting to `Static`.
    #[must_use]
    pub fn slot_type(&self) -> SlotType {
        self.slot_type.clone().unwrap_or_default()
    }

    /// Returns the reported state, defaulting to `Unknown`.
    #[must_use]
    pub fn state(&self) -> SlotState {
        self.state.clone().unwrap_or_default()
    }

    /// Returns the value of a numeric attribute; absent GPU counts read as zero.
    #[must_use]
    pub fn field(&self, field: SlotField) -> MetricValue {
        match field {
            SlotField::Cpus => self.cpus,
            SlotField::TotalSlotCpus => self.total_slot_cpus,
            SlotField::TotalCpus => self.total_cpus,
            SlotField::Disk => self.disk,
            SlotField::TotalSlotDisk => self.total_slot_disk,
            SlotField::TotalDisk => self.total_disk,
            SlotField::Memory => self.memory,
            SlotField::TotalSlotMemory => self.total_slot_memory,
            SlotField::TotalMemory => self.total_memory,
            SlotField::LoadAvg => self.load_avg,
            SlotField::TotalCondorLoadAvg => self.total_condor_load_avg,
            SlotField::TotalLoadAvg => self.total_load_avg,
            SlotField::Gpus => self.gpus.unwrap_or_default(),
            SlotField::TotalSlotGpus => self.total_slot_gpus.unwrap_or_default(),
        }
    }

    /// GPU attribute used on the partitionable path: `TotalSlotGpus`, else `Gpus`.
    #[must_use]
    pub fn partitionable_gpu_field(&self) -> Option<SlotField> {
        if self.total_slot_gpus.is_some() {
            Some(SlotField::TotalSlotGpus)
        } else if self.gpus.is_some() {
            Some(SlotField::Gpus)
        } else {
            None
        }
    }

    /// GPU attribute used on the claimed and per-state paths.
    #[must_use]
    pub fn dynamic_gpu_field(&self) -> Option<SlotField> {
        self.gpus.map(|_| SlotField::Gpus)
    }
}

/// One glidein slot as advertised by its startd.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct GlideinRecord {
    #[serde(rename = "GLIDEIN_Site")]
    pub site: Option<String>,
    #[serde(rename = "GLIDEIN_Resource_Name")]
    pub resource_name: Option<String>,
    /// Older glideins advertise the resource under this spelling.
    #[serde(rename = "GLIDEIN_ResourceName")]
    pub legacy_resource_name: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<SlotState>,
    /// Unix seconds.
    #[serde(rename = "DaemonStartTime")]
    pub daemon_start_time: Option<f64>,
    #[serde(rename = "Disk", deserialize_with = "zero_if_null")]
    pub disk: MetricValue,
    #[serde(rename = "Memory", deserialize_with = "zero_if_null")]
    pub memory: MetricValue,
    #[serde(rename = "Cpus", deserialize_with = "zero_if_null")]
    pub cpus: MetricValue,
    #[serde(rename = "LoadAvg", deserialize_with = "zero_if_null")]
    pub load_avg: MetricValue,
    #[serde(rename = "RemoteOwner")]
    pub remote_owner: Option<String>,
}

impl GlideinRecord {
    /// Returns the site label, defaulting to `Unknown`.
    #[must_use]
    pub fn site(&self) -> &str {
        self.site.as_deref().unwrap_or("Unknown")
    }

    /// Returns the resource label, preferring the current attribute name.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource_name
            .as_deref()
            .or(self.legacy_resource_name.as_deref())
            .unwrap_or("Unknown")
    }
}

/// The drain daemon's pool-wide advertisement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct DrainRecord {
    #[serde(rename = "AvgDrainingUnclaimed")]
    pub avg_draining_unclaimed: Option<MetricValue>,
    #[serde(rename = "WholeMachines")]
    pub whole_machines: Option<MetricValue>,
    #[serde(rename = "RecentDrainSuccesses")]
    pub recent_drain_successes: Option<MetricValue>,
    #[serde(rename = "MeanDrainedArrivalSD")]
    pub mean_drained_arrival_sd: Option<MetricValue>,
    #[serde(rename = "MeanDrainedArrival")]
    pub mean_drained_arrival: Option<MetricValue>,
    #[serde(rename = "RecentDrainFailures")]
    pub recent_drain_failures: Option<MetricValue>,
    #[serde(rename = "DrainedMachines")]
    pub drained_machines: Option<MetricValue>,
    #[serde(rename = "MachinesDraining")]
    pub machines_draining: Option<MetricValue>,
    #[serde(rename = "DrainSuccesses")]
    pub drain_successes: Option<MetricValue>,
    #[serde(rename = "WholeMachinesPeak")]
    pub whole_machines_peak: Option<MetricValue>,
    #[serde(rename = "AvgDrainingBadput")]
    pub avg_draining_badput: Option<MetricValue>,
}

impl DrainRecord {
    /// Attribute names republished by the drain aggregator, in advertisement order.
    pub const FIELDS: [&'static str; 11] = [
        "AvgDrainingUnclaimed",
        "WholeMachines",
        "RecentDrainSuccesses",
        "MeanDrainedArrivalSD",
        "MeanDrainedArrival",
        "RecentDrainFailures",
        "DrainedMachines",
        "MachinesDraining",
        "DrainSuccesses",
        "WholeMachinesPeak",
        "AvgDrainingBadput",
    ];

    /// Pairs each republished attribute name with its value, if advertised.
    #[must_use]
    pub fn fields(&self) -> [(&'static str, Option<MetricValue>); 11] {
        [
            ("AvgDrainingUnclaimed", self.avg_draining_unclaimed),
            ("WholeMachines", self.whole_machines),
            ("RecentDrainSuccesses", self.recent_drain_successes),
            ("MeanDrainedArrivalSD", self.mean_drained_arrival_sd),
            ("MeanDrainedArrival", self.mean_drained_arrival),
            ("RecentDrainFailures", self.recent_drain_failures),
            ("DrainedMachines", self.drained_machines),
            ("MachinesDraining", self.machines_draining),
            ("DrainSuccesses", self.drain_successes),
            ("WholeMachinesPeak", self.whole_machines_peak),
            ("AvgDrainingBadput", self.avg_draining_badput),
        ]
    }
}

/// Resource usage of one running job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobUsageRecord {
    /// Resident set size in KB.
    #[serde(rename = "ResidentSetSize_RAW", deserialize_with = "zero_if_null")]
    pub resident_set_size: MetricValue,
    /// Scratch disk usage in KB.
    #[serde(rename = "DiskUsage_RAW", deserialize_with = "zero_if_null")]
    pub disk_usage: MetricValue,
}
