//! End-to-end tests for slot-metrics.
//!
//! These tests exercise full collections:
//! - Ad dumps on disk read through the directory source
//! - Retries against flaky sources
//! - Partial schedd failures
//! - Writing finished maps to sinks

#![cfg(test)]
