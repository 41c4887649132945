//! Where ads come from.
//!
//! An [`AdSource`] answers the three round trips a poll makes: querying the
//! pool manager, locating the pool's schedds and querying one schedd. The
//! collector never talks to a source directly; every call goes through the
//! [`RetryingFetcher`](crate::retry::RetryingFetcher).

mod dir;
mod memory;

pub use dir::DirAdSource;
pub use memory::MemoryAdSource;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::Query;
use crate::records::Ad;

/// A schedd found in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheddLocation {
    /// The schedd's name.
    pub name: String,
    /// Where the schedd can be reached, if the source knows.
    pub address: Option<String>,
}

impl ScheddLocation {
    /// Creates a location with no address.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }

    /// Sets the address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl fmt::Display for ScheddLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{} ({address})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A source of collector and schedd ads.
///
/// Implementations return ads already filtered by the query's constraint and
/// projected onto its attributes.
pub trait AdSource: Send + Sync {
    /// Queries the pool manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager cannot be reached or its answer cannot
    /// be read.
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>>;

    /// Lists the schedds registered with the pool manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager cannot be reached.
    fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>>;

    /// Queries one schedd's job queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedd cannot be reached.
    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>>;

    /// Returns the name of this source for logging purposes.
    fn name(&self) -> &'static str;
}

impl<S: AdSource + ?Sized> AdSource for &S {
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        (**self).query(pool, query)
    }

    fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>> {
        (**self).locate_schedds(pool)
    }

    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        (**self).query_schedd(schedd, query)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: AdSource + ?Sized> AdSource for Arc<S> {
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        (**self).query(pool, query)
    }

    fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>> {
        (**self).locate_schedds(pool)
    }

    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        (**self).query_schedd(schedd, query)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: AdSource + ?Sized> AdSource for Box<S> {
    fn query(&self, pool: &str, query: &Query) -> Result<Vec<Ad>> {
        (**self).query(pool, query)
    }

    fn locate_schedds(&self, pool: &str) -> Result<Vec<ScheddLocation>> {
        (**self).locate_schedds(pool)
    }

    fn query_schedd(&self, schedd: &ScheddLocation, query: &Query) -> Result<Vec<Ad>> {
        (**self).query_schedd(schedd, query)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        assert_eq!(ScheddLocation::new("submit01").to_string(), "submit01");
        assert_eq!(
            ScheddLocation::new("submit01")
                .with_address("<10.0.0.1:9618>")
                .to_string(),
            "submit01 (<10.0.0.1:9618>)"
        );
    }

    #[test]
    fn source_is_object_safe() {
        let source: Box<dyn AdSource> = Box::new(MemoryAdSource::new());
        assert_eq!(source.name(), "MemoryAdSource");
        assert!(source.locate_schedds("pool").is_ok_and(|s| s.is_empty()));
    }

    #[test]
    fn arc_source_delegates() {
        let source = Arc::new(MemoryAdSource::new().with_schedd("submit01", Vec::new()));
        let shared = Arc::clone(&source);
        assert!(shared.locate_schedds("pool").is_ok_and(|s| s.len() == 1));
        assert_eq!(source.locate_calls(), 1);
    }
}
