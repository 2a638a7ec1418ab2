//! aidlgate - versioning, freezing and compatibility checks for AIDL interfaces
//!
//! This crate provides the library behind the `aidlgate` binary: loading
//! interface declarations, resolving versions, validating frozen API dumps,
//! checking consumers, and planning the build actions that enforce them.

pub mod api;
pub mod builder;
pub mod core;
pub mod freeze;
pub mod ops;
pub mod registry;
pub mod util;
pub mod validate;

/// Test utilities and mocks for aidlgate unit tests.
#[cfg(test)]
pub(crate) mod test_support;

pub use core::{Interface, Manifest, Policy, Workspace};
pub use registry::{Registry, Violations};
