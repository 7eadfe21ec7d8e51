//! AWS-oriented adapters and handlers for the uploads glue functions.
//!
//! This crate owns runtime integration details (Lambda handlers, topic and
//! queue dispatch, blob-store probes, and the catalog database adapter) and
//! exposes a single runtime module boundary for the domain contracts.

pub mod adapters;
pub mod handlers;
pub mod runtime;
