//! Typed collector and schedd queries.
//!
//! A [`Query`] names the kind of ad to fetch, the [`Constraint`] the ads must
//! satisfy and the attributes to project. Constraints render to the
//! expression text a pool manager understands and can also be evaluated
//! locally against an [`Ad`], which is how file-backed and in-memory sources
//! filter their ads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::Ad;

/// The kind of ad a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdType {
    /// Slot ads published by startds.
    Startd,
    /// Schedd (job queue) ads.
    Schedd,
    /// Ads of any type.
    Any,
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startd => write!(f, "Startd"),
            Self::Schedd => write!(f, "Schedd"),
            Self::Any => write!(f, "Any"),
        }
    }
}

/// Job status codes as stored in a job's `JobStatus` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum JobStatus {
    Idle,
    Running,
    Removed,
    Completed,
    Held,
    TransferringOutput,
    Suspended,
}

impl JobStatus {
    /// Returns the numeric code of this status.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Idle => 1,
            Self::Running => 2,
            Self::Removed => 3,
            Self::Completed => 4,
            Self::Held => 5,
            Self::TransferringOutput => 6,
            Self::Suspended => 7,
        }
    }
}

/// A filter on ads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// Every ad matches.
    All,
    /// Slots started by a glidein pilot.
    IsGlidein,
    /// Ads whose `MyType` equals the given type.
    MyType(String),
    /// Jobs in the given status.
    JobStatus(JobStatus),
}

impl Constraint {
    /// Evaluates the constraint against an ad.
    ///
    /// Attribute names and string comparisons are case-insensitive, as they
    /// are in the pool manager. A missing attribute never matches.
    #[must_use]
    pub fn matches(&self, ad: &Ad) -> bool {
        match self {
            Self::All => true,
            Self::IsGlidein => matches!(lookup(ad, "is_glidein"), Some(Value::Bool(true))),
            Self::MyType(my_type) => lookup(ad, "MyType")
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(my_type)),
            Self::JobStatus(status) => {
                lookup(ad, "JobStatus").and_then(Value::as_i64) == Some(status.code())
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "true"),
            Self::IsGlidein => write!(f, "is_glidein == True"),
            Self::MyType(my_type) => write!(f, "MyType == {my_type:?}"),
            Self::JobStatus(status) => write!(f, "JobStatus == {}", status.code()),
        }
    }
}

/// Looks up an attribute, falling back to a case-insensitive match.
fn lookup<'a>(ad: &'a Ad, name: &str) -> Option<&'a Value> {
    ad.get(name).or_else(|| {
        ad.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

const SLOT_PROJECTION: &[&str] = &[
    "SlotType",
    "State",
    "Name",
    "SlotWeight",
    "Cpus",
    "TotalSlotCpus",
    "TotalCpus",
    "Disk",
    "TotalSlotDisk",
    "TotalDisk",
    "Memory",
    "TotalSlotMemory",
    "TotalMemory",
    "LoadAvg",
    "TotalCondorLoadAvg",
    "TotalLoadAvg",
    "AccountingGroup",
    "RemoteGroup",
    "RemoteOwner",
    "TotalSlotGpus",
    "Gpus",
];

const GLIDEIN_PROJECTION: &[&str] = &[
    "GLIDEIN_Site",
    "GLIDEIN_Resource_Name",
    "GLIDEIN_ResourceName",
    "State",
    "DaemonStartTime",
    "Disk",
    "Memory",
    "Cpus",
    "RemoteOwner",
    "LoadAvg",
];

const JOB_USAGE_PROJECTION: &[&str] = &["ResidentSetSize_RAW", "DiskUsage_RAW"];

/// One query: what to fetch, which ads qualify and which attributes to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The kind of ad to fetch.
    pub ad_type: AdType,
    /// The filter ads must satisfy.
    pub constraint: Constraint,
    /// Attributes to keep; empty keeps every attribute.
    pub projection: Vec<String>,
}

impl Query {
    /// Creates a query with no projection.
    #[must_use]
    pub fn new(ad_type: AdType, constraint: Constraint) -> Self {
        Self {
            ad_type,
            constraint,
            projection: Vec::new(),
        }
    }

    /// Restricts the query to the given attributes.
    #[must_use]
    pub fn with_projection<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Every startd slot, with the attributes the slot aggregator reads.
    #[must_use]
    pub fn startd_slots() -> Self {
        Self::new(AdType::Startd, Constraint::All).with_projection(SLOT_PROJECTION.iter().copied())
    }

    /// Glidein slots, with the attributes the glidein aggregator reads.
    #[must_use]
    pub fn glidein_slots() -> Self {
        Self::new(AdType::Startd, Constraint::IsGlidein)
            .with_projection(GLIDEIN_PROJECTION.iter().copied())
    }

    /// The drain daemon's ad, unprojected.
    #[must_use]
    pub fn defrag() -> Self {
        Self::new(AdType::Any, Constraint::MyType("Defrag".to_string()))
    }

    /// Running jobs of one schedd, with their resource usage.
    #[must_use]
    pub fn running_jobs() -> Self {
        Self::new(AdType::Schedd, Constraint::JobStatus(JobStatus::Running))
            .with_projection(JOB_USAGE_PROJECTION.iter().copied())
    }

    /// Returns true if `ad` satisfies this query's constraint.
    #[must_use]
    pub fn matches(&self, ad: &Ad) -> bool {
        self.constraint.matches(ad)
    }

    /// Returns a copy of `ad` holding only the projected attributes.
    #[must_use]
    pub fn project(&self, ad: &Ad) -> Ad {
        if self.projection.is_empty() {
            return ad.clone();
        }
        ad.iter()
            .filter(|(key, _)| self.projection.iter().any(|p| p.eq_ignore_ascii_case(key)))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Filters and projects a batch of ads.
    #[must_use]
    pub fn apply<'a, I>(&self, ads: I) -> Vec<Ad>
    where
        I: IntoIterator<Item = &'a Ad>,
    {
        ads.into_iter()
            .filter(|ad| self.matches(ad))
            .map(|ad| self.project(ad))
            .collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} where {}", self.ad_type, self.constraint)
    }
}
