//! Core types for the metrics system.
//!
//! This module provides the fundamental types used throughout the slot-metrics crate:
//! - [`MetricKey`]: A dotted, hierarchical metric key
//! - [`MetricValue`]: An integer counter or float gauge
//! - [`MetricMap`]: The ordered key to value mapping every aggregator produces

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Separator placed between the segments of a [`MetricKey`].
pub const KEY_SEPARATOR: char = '.';

/// A hierarchical metric key such as `Static.Unclaimed.Cpus`.
///
/// Keys are built by joining classification labels with [`KEY_SEPARATOR`].
/// Each aggregator always puts a given dimension (slot type, state, group,
/// owner, field) at the same position, so consumers can split keys
/// positionally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricKey(String);

impl MetricKey {
    /// Creates a validated metric key from its dotted form.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricKey` if the key is empty, has an
    /// empty segment, or contains whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();

        if key.is_empty() {
            return Err(MetricsError::InvalidMetricKey {
                reason: "metric key cannot be empty".to_string(),
            });
        }

        if key.split(KEY_SEPARATOR).any(str::is_empty) {
            return Err(MetricsError::InvalidMetricKey {
                reason: format!("metric key '{key}' has an empty segment"),
            });
        }

        if let Some(c) = key.chars().find(|c| c.is_whitespace()) {
            return Err(MetricsError::InvalidMetricKey {
                reason: format!("invalid character {c:?} in metric key"),
            });
        }

        Ok(Self(key))
    }

    /// Joins label segments into a key.
    ///
    /// Segments are taken verbatim; callers sanitize free-form labels first.
    pub fn join<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for (i, segment) in segments.into_iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(segment.as_ref());
        }
        Self(key)
    }

    /// Returns this key with `prefix` prepended as its first segment(s).
    #[must_use]
    pub fn prefixed(&self, prefix: &MetricKey) -> Self {
        Self::join([prefix.as_str(), self.as_str()])
    }

    /// Iterates over the dotted segments of the key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_SEPARATOR)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MetricKey` and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MetricKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A numeric metric value.
///
/// Counters and integral capacities (cpus, MB, KB) stay integers; any float
/// contribution (load averages, fractional weights) turns the sum into a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer counter or capacity.
    Int(i64),
    /// Floating point gauge.
    Float(f64),
}

impl MetricValue {
    /// The additive identity.
    pub const ZERO: Self = Self::Int(0);

    /// Returns the value as an `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Pool capacities stay far below 2^52
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Returns the value as an `i64`, truncating floats toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::Float(v) => v as i64,
        }
    }

    /// Returns true if the value is (integer or float) zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(v) => v == 0,
            Self::Float(v) => v == 0.0,
        }
    }
}

impl Default for MetricValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for MetricValue {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => Self::Int(a.saturating_add(b)),
            (a, b) => Self::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl AddAssign for MetricValue {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for MetricValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// The output of every aggregator: dotted metric keys mapped to values.
///
/// Iteration order is the lexical order of the keys, so two maps with the
/// same content always render identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricMap(BTreeMap<MetricKey, MetricValue>);

impl MetricMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to whatever is already stored under `key`.
    pub fn add(&mut self, key: MetricKey, value: impl Into<MetricValue>) {
        *self.0.entry(key).or_default() += value.into();
    }

    /// Adds one to the counter stored under `key`.
    pub fn increment(&mut self, key: MetricKey) {
        self.add(key, 1_i64);
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: MetricKey, value: impl Into<MetricValue>) {
        self.0.insert(key, value.into());
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.0.get(key).copied()
    }

    /// Returns true if `key` has a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&MetricKey, MetricValue)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.0.keys()
    }

    /// Iterates over the keys that start with `prefix` followed by a separator.
    pub fn keys_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a MetricKey> + 'a {
        self.0.keys().filter(move |k| {
            k.as_str()
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
        })
    }

    /// Sums every value of `other` into this map, key by key.
    ///
    /// This is the associative merge that lets partial aggregates be combined.
    pub fn merge_sum(&mut self, other: Self) {
        for (key, value) in other.0 {
            self.add(key, value);
        }
    }

    /// Copies every value of `other` into this map, replacing existing values.
    pub fn merge_overwrite(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Returns a copy of this map with `prefix` prepended to every key.
    #[must_use]
    pub fn with_prefix(&self, prefix: &MetricKey) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| (k.prefixed(prefix), *v))
                .collect(),
        )
    }

    /// Consumes the map and returns the underlying ordered map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<MetricKey, MetricValue> {
        self.0
    }
}

impl FromIterator<(MetricKey, MetricValue)> for MetricMap {
    fn from_iter<T: IntoIterator<Item = (MetricKey, MetricValue)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.add(key, value);
        }
        map
    }
}

impl IntoIterator for MetricMap {
    type Item = (MetricKey, MetricValue);
    type IntoIter = std::collections::btree_map::IntoIter<MetricKey, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
