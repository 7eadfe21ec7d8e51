pub mod reconcile;
pub mod relay;
