//! Consumer build modules.
//!
//! A consumer is any `[[module]]` that links generated bindings. Kinds form a
//! closed set grouped by language; each group carries only what import
//! resolution needs to know about it.

use std::fmt;

use serde::Deserialize;

use crate::core::backend::Backend;

/// `kind` of a `[[module]]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    CcBinary,
    CcLibrary,
    CcTest,
    CcTestLibrary,
    CcBenchmark,
    JavaLibrary,
    AndroidApp,
    AndroidTest,
    RustBinary,
    RustLibrary,
    RustTest,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::CcBinary => "cc_binary",
            ModuleKind::CcLibrary => "cc_library",
            ModuleKind::CcTest => "cc_test",
            ModuleKind::CcTestLibrary => "cc_test_library",
            ModuleKind::CcBenchmark => "cc_benchmark",
            ModuleKind::JavaLibrary => "java_library",
            ModuleKind::AndroidApp => "android_app",
            ModuleKind::AndroidTest => "android_test",
            ModuleKind::RustBinary => "rust_binary",
            ModuleKind::RustLibrary => "rust_library",
            ModuleKind::RustTest => "rust_test",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `[[module]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDecl {
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcFlavor {
    Binary,
    Library,
    Test,
    TestLibrary,
    Benchmark,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcModule {
    pub name: String,
    pub flavor: CcFlavor,
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaFlavor {
    Library,
    App,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaModule {
    pub name: String,
    pub flavor: JavaFlavor,
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RustFlavor {
    Binary,
    Library,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustModule {
    pub name: String,
    pub flavor: RustFlavor,
    pub deps: Vec<String>,
}

/// What a consumer kind can do with generated bindings.
pub trait ResolvesImports {
    /// Backends whose bindings this module can link.
    fn linkable_backends(&self) -> &'static [Backend];

    /// Whether using an unfrozen version is tolerated in this module.
    fn exempt_from_frozen_check(&self) -> bool;

    /// Whether a dependency on `<interface>[-V<version>]-<backend>` can be
    /// satisfied by this module.
    fn resolves_imports_as(&self, _interface: &str, _version: &str, backend: Backend) -> bool {
        self.linkable_backends().contains(&backend)
    }
}

const CC_BACKENDS: &[Backend] = &[
    Backend::Cpp,
    Backend::Ndk,
    Backend::NdkPlatform,
    Backend::CppAnalyzer,
];
const JAVA_BACKENDS: &[Backend] = &[Backend::Java];
const RUST_BACKENDS: &[Backend] = &[Backend::Rust];

impl ResolvesImports for CcModule {
    fn linkable_backends(&self) -> &'static [Backend] {
        CC_BACKENDS
    }

    fn exempt_from_frozen_check(&self) -> bool {
        matches!(
            self.flavor,
            CcFlavor::Test | CcFlavor::TestLibrary | CcFlavor::Benchmark
        )
    }
}

impl ResolvesImports for JavaModule {
    fn linkable_backends(&self) -> &'static [Backend] {
        JAVA_BACKENDS
    }

    fn exempt_from_frozen_check(&self) -> bool {
        self.flavor == JavaFlavor::Test
    }
}

impl ResolvesImports for RustModule {
    fn linkable_backends(&self) -> &'static [Backend] {
        RUST_BACKENDS
    }

    // Only the cc and android test kinds are exempt.
    fn exempt_from_frozen_check(&self) -> bool {
        false
    }
}

/// A consumer build module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerModule {
    Cc(CcModule),
    Java(JavaModule),
    Rust(RustModule),
}

impl ConsumerModule {
    pub fn from_decl(decl: ModuleDecl) -> ConsumerModule {
        let ModuleDecl { name, kind, deps } = decl;
        match kind {
            ModuleKind::CcBinary => cc(name, CcFlavor::Binary, deps),
            ModuleKind::CcLibrary => cc(name, CcFlavor::Library, deps),
            ModuleKind::CcTest => cc(name, CcFlavor::Test, deps),
            ModuleKind::CcTestLibrary => cc(name, CcFlavor::TestLibrary, deps),
            ModuleKind::CcBenchmark => cc(name, CcFlavor::Benchmark, deps),
            ModuleKind::JavaLibrary => java(name, JavaFlavor::Library, deps),
            ModuleKind::AndroidApp => java(name, JavaFlavor::App, deps),
            ModuleKind::AndroidTest => java(name, JavaFlavor::Test, deps),
            ModuleKind::RustBinary => rust(name, RustFlavor::Binary, deps),
            ModuleKind::RustLibrary => rust(name, RustFlavor::Library, deps),
            ModuleKind::RustTest => rust(name, RustFlavor::Test, deps),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ConsumerModule::Cc(m) => &m.name,
            ConsumerModule::Java(m) => &m.name,
            ConsumerModule::Rust(m) => &m.name,
        }
    }

    pub fn deps(&self) -> &[String] {
        match self {
            ConsumerModule::Cc(m) => &m.deps,
            ConsumerModule::Java(m) => &m.deps,
            ConsumerModule::Rust(m) => &m.deps,
        }
    }

    pub fn kind(&self) -> ModuleKind {
        match self {
            ConsumerModule::Cc(m) => match m.flavor {
                CcFlavor::Binary => ModuleKind::CcBinary,
                CcFlavor::Library => ModuleKind::CcLibrary,
                CcFlavor::Test => ModuleKind::CcTest,
                CcFlavor::TestLibrary => ModuleKind::CcTestLibrary,
                CcFlavor::Benchmark => ModuleKind::CcBenchmark,
            },
            ConsumerModule::Java(m) => match m.flavor {
                JavaFlavor::Library => ModuleKind::JavaLibrary,
                JavaFlavor::App => ModuleKind::AndroidApp,
                JavaFlavor::Test => ModuleKind::AndroidTest,
            },
            ConsumerModule::Rust(m) => match m.flavor {
                RustFlavor::Binary => ModuleKind::RustBinary,
                RustFlavor::Library => ModuleKind::RustLibrary,
                RustFlavor::Test => ModuleKind::RustTest,
            },
        }
    }

    /// The capability view of this module.
    pub fn capabilities(&self) -> &dyn ResolvesImports {
        match self {
            ConsumerModule::Cc(m) => m,
            ConsumerModule::Java(m) => m,
            ConsumerModule::Rust(m) => m,
        }
    }
}

fn cc(name: String, flavor: CcFlavor, deps: Vec<String>) -> ConsumerModule {
    ConsumerModule::Cc(CcModule { name, flavor, deps })
}

fn java(name: String, flavor: JavaFlavor, deps: Vec<String>) -> ConsumerModule {
    ConsumerModule::Java(JavaModule { name, flavor, deps })
}

fn rust(name: String, flavor: RustFlavor, deps: Vec<String>) -> ConsumerModule {
    ConsumerModule::Rust(RustModule { name, flavor, deps })
}
