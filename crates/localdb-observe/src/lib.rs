//! Observability for localdb.

pub mod tracing_setup;
