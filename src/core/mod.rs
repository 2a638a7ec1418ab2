//! Core data structures for aidlgate.
//!
//! This module contains the declaration-phase types:
//! - Version algebra
//! - Interface and consumer module declarations
//! - Release policy
//! - Declaration files and workspace discovery

pub mod backend;
pub mod binding;
pub mod interface;
pub mod manifest;
pub mod module;
pub mod policy;
pub mod version;
pub mod workspace;

pub use backend::Backend;
pub use binding::{Binding, BindingId};
pub use interface::{Interface, InterfaceDecl, InterfaceKey, VersionInfo};
pub use manifest::{Manifest, MANIFEST_NAME};
pub use module::{ConsumerModule, ModuleKind};
pub use policy::Policy;
pub use workspace::Workspace;
