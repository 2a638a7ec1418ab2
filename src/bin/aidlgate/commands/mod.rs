//! Command implementations

pub mod check;
pub mod completions;
pub mod freeze_api;
pub mod metadata;
pub mod plan;
pub mod update_api;
