//! Persisting bootstrap batches.

pub mod json;

pub use json::BootstrapRecord;
