pub mod catalog;
pub mod object_store;
pub mod queue;
pub mod topic;
