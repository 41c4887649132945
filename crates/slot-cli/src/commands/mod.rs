//! CLI command implementations.
//!
//! - [`collect`] - one poll of the pool, written in the chosen format

pub mod collect;

pub use collect::CollectCommand;
