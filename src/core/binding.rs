//! Generated per-language bindings.

use std::fmt;

use serde::Serialize;

use crate::core::backend::Backend;
use crate::core::interface::{InterfaceKey, ROOT_NAMESPACE};
use crate::core::version::versioned_module_name;

/// Name of a binding within its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BindingId {
    pub namespace: String,
    pub name: String,
}

impl BindingId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        BindingId {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == ROOT_NAMESPACE {
            write!(f, "{}", self.name)
        } else {
            write!(f, "//{}:{}", self.namespace, self.name)
        }
    }
}

/// One generated library: interface × version × backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub interface: InterfaceKey,
    /// Concrete version, `""` for an unstable interface.
    pub version: String,
    pub backend: Backend,
    /// The tip of an interface that is required to be frozen.
    pub not_frozen: bool,
    pub require_frozen_reason: String,
    /// Bindings of the imports of this version, same backend.
    pub deps: Vec<BindingId>,
}

impl Binding {
    /// `<base>[-V<version>]-<backend>`.
    pub fn name(&self) -> String {
        versioned_module_name(&self.interface.name, &self.version, self.backend.as_str())
    }

    pub fn id(&self) -> BindingId {
        BindingId::new(self.interface.namespace.clone(), self.name())
    }

    /// Name of the generation action producing this binding.
    pub fn source_name(&self) -> String {
        format!("{}-source", self.name())
    }

    /// Key identifying the interface and language, regardless of version.
    pub fn family(&self) -> String {
        format!("{}-{}", self.interface, self.backend.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_names() {
        let b = Binding {
            interface: InterfaceKey::new(".", "foo"),
            version: "2".to_string(),
            backend: Backend::Ndk,
            not_frozen: false,
            require_frozen_reason: String::new(),
            deps: vec![],
        };
        assert_eq!(b.name(), "foo-V2-ndk");
        assert_eq!(b.source_name(), "foo-V2-ndk-source");
        assert_eq!(b.family(), "foo-ndk");
        assert_eq!(b.id().to_string(), "foo-V2-ndk");

        let unstable = Binding {
            version: String::new(),
            interface: InterfaceKey::new("vendor", "foo"),
            ..b
        };
        assert_eq!(unstable.name(), "foo-ndk");
        assert_eq!(unstable.id().to_string(), "//vendor:foo-ndk");
        assert_eq!(unstable.family(), "//vendor:foo-ndk");
    }
}
