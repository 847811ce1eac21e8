//! Shared domain types for localdb.
//!
//! This crate contains the types used across the localdb layer: scalar
//! values, table schemas, filter specifications, and their associated
//! error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod error;
pub mod filter;
pub mod schema;
pub mod value;
