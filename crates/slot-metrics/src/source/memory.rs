//! In-memory ad source with injectable failures.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{MetricsError, Result};
use crate::query::{AdType, Query};
use crate::records::Ad;
use crate::source::{AdSource, ScheddLocation};

#[derive(Debug, Default)]
struct State {
    startd_ads: Vec<Ad>,
    any_ads: Option<Vec<Ad>>,
    schedds: BTreeMap<String, Vec<Ad>>,
    failing_queries: u32,
    failing_locates: u32,
    failing_schedds: BTreeSet<String>,
    query_calls: u32,
    locate_calls: u32,
}

/// Serves ads held in memory.
///
/// Useful for embedding pre-fetched ads and for exercising the retry and
/// isolation paths: the next N queries or locates can be made to fail, and
/// individual schedds can be made unreachable.
#[derive(Debug, Default)]
pub struct MemoryAdSource {
    state: RwLock<State>,
}

impl MemoryAdSource {
    /// Creates a source with no ads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the startd ads.
    #[must_use]
    pub fn with_startd_ads(self, ads: Vec<Ad>) -> Self {
        self.state.write().startd_ads = ads;
        self
    }

    /// Sets the ads answered to `Any` queries; without them the startd ads are used.
    #[must_use]
    pub fn with_any_ads(self, ads: Vec<Ad>) -> Self {
        self.state.write().any_ads = Some(ads);
        self
    }

    /// Registers a schedd and its job ads.
    #[must_use]
    pub fn with_schedd(self, name: impl Into<String>, jobs: Vec<Ad>) -> Self {
        self.state.write().schedds.insert(name.into(), jobs);
        self
    }

    /// Makes the next `count` pool manager queries fail.
    pub fn fail_queries(&self, count: u32) {
        self.state.write().failing_queries = count;
    }

    /// Makes the next `count` schedd lookups fail.
    pub fn fail_locates(&self, count: u32) {
        self.state.write().failing_locates = count;
    }

    /// Makes every query to the named schedd fail.
    pub fn fail_schedd(&self, name: impl Into<String>) {
        self.state.write().failing_schedds.insert(name.into());
    }

    /// Returns how many pool manager queries were made.
    #[must_use]
    pub fn query_calls(&self) -> u32 {
        self.state.read().query_calls
    }

    /// Returns how many schedd lookups were made.
    #[must_use]
    pub fn locate_calls(&self) -> u32 {
        self.state.read().locate_calls
    }
}

fn schedd_ad(name: &str) -> Ad {
    let mut ad = Ad::new();
    ad.insert("MyType".to_string(), Value::from("Scheduler"));
    ad.insert("Name".to_string(), Value::from(name));
    ad
}

impl AdSource for MemoryAdSource {
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        let mut state = self.state.write();
        state.query_calls += 1;
        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(MetricsError::query_failed(pool, "injected query failure"));
        }

        let ads = match query.ad_type {
            AdType::Startd => query.apply(&state.startd_ads),
            AdType::Any => query.apply(state.any_ads.as_ref().unwrap_or(&state.startd_ads)),
            AdType::Schedd => {
                let ads: Vec<Ad> = state.schedds.keys().map(|name| schedd_ad(name)).collect();
                query.apply(&ads)
            }
        };
        Ok(ads)
    }

    fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>> {
        let mut state = self.state.write();
        state.locate_calls += 1;
        if state.failing_locates > 0 {
            state.failing_locates -= 1;
            return Err(MetricsError::query_failed(pool, "injected locate failure"));
        }
        Ok(state.schedds.keys().map(ScheddLocation::new).collect())
    }

    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        let state = self.state.read();
        if state.failing_schedds.contains(&schedd.name) {
            return Err(MetricsError::query_failed(&schedd.name, "schedd unreachable"));
        }
        state
            .schedds
            .get(&schedd.name)
            .map(|jobs| query.apply(jobs))
            .ok_or_else(|| MetricsError::query_failed(&schedd.name, "unknown schedd"))
    }

    fn name(&self) -> &'static str {
        "MemoryAdSource"
    }
}
