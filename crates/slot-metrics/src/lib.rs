//! Pool capacity metrics for HTCondor-style batch pools.
//!
//! `slot-metrics` polls a pool's manager for slot, glidein, drain and job
//! ads and folds them into flat maps of dotted metric keys, ready to be
//! written to a Graphite-style sink.
//!
//! # Features
//!
//! - **Slot accounting**: capacity by slot type, state, accounting group and owner
//! - **Glidein accounting**: pilot slots by site, resource and owner
//! - **Job usage**: memory and disk actually used by running jobs
//! - **Drain statistics**: the drain daemon's counters, republished
//! - **Bounded retries**: every manager round trip retried with a fixed delay
//!
//! # Example
//!
//! ```rust
//! use slot_metrics::{MemoryAdSource, PoolCollector, RetryPolicy};
//! use serde_json::json;
//!
//! let slot = json!({"SlotType": "Static", "State": "Unclaimed", "Cpus": 4, "Memory": 8000});
//! let source = MemoryAdSource::new()
//!     .with_startd_ads(vec![slot.as_object().cloned().unwrap_or_default()]);
//!
//! let collector = PoolCollector::new(source, "cm.example.org", RetryPolicy::immediate(4));
//! let metrics = collector.pool_slots();
//! assert_eq!(metrics.get("Static.Unclaimed.Cpus").map(|v| v.as_i64()), Some(4));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod aggregate;
pub mod classify;
pub mod collector;
pub mod config;
pub mod error;
pub mod query;
pub mod records;
pub mod retry;
pub mod sink;
pub mod source;
pub mod types;

// Re-export main types at crate root
pub use aggregate::{GlideinAggregator, RecordAggregator, SlotAggregator, UtilizationTotals, drain_metrics};
pub use classify::{classify, memory_tier, sanitize};
pub use collector::{
    PoolCollector, get_defrag_info, get_pool_glidein_slots, get_pool_resource_utilization,
    get_pool_slots,
};
pub use config::PollConfig;
pub use error::{MetricsError, Result};
pub use query::{AdType, Constraint, JobStatus, Query};
pub use records::{Ad, DrainRecord, GlideinRecord, JobUsageRecord, SlotRecord, SlotState, SlotType};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use sink::{MemorySink, MetricSink, PlaintextSink};
pub use source::{AdSource, DirAdSource, MemoryAdSource, ScheddLocation};
pub use types::{MetricKey, MetricMap, MetricValue};
