//! Shared uploads-pipeline domain primitives.
//!
//! This crate owns event decoding, reconciliation records, and the
//! request/response contracts of both Lambda handlers. It intentionally
//! excludes AWS SDK, MySQL, and Lambda runtime concerns.

pub mod config;
pub mod contract;
pub mod response;
