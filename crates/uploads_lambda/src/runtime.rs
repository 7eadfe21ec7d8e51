//! Module boundary over the runtime-free domain crate.

pub use uploads_core::{config, contract, response};
