//! Code-generation backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language backend of the IDL compiler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Cpp,
    Java,
    Ndk,
    NdkPlatform,
    Rust,
    /// Host-side analysis library, generated for the tip only.
    #[serde(rename = "cpp-analyzer")]
    CppAnalyzer,
}

impl Backend {
    /// Backends an interface can enable or disable in its declaration.
    pub const DECLARABLE: [Backend; 4] = [Backend::Cpp, Backend::Java, Backend::Ndk, Backend::Rust];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cpp => "cpp",
            Backend::Java => "java",
            Backend::Ndk => "ndk",
            Backend::NdkPlatform => "ndk_platform",
            Backend::Rust => "rust",
            Backend::CppAnalyzer => "cpp-analyzer",
        }
    }

    /// The value passed to the compiler's `--lang` flag.
    pub fn lang_flag(&self) -> &'static str {
        match self {
            Backend::NdkPlatform => "ndk",
            Backend::CppAnalyzer => "cpp",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpp" => Ok(Backend::Cpp),
            "java" => Ok(Backend::Java),
            "ndk" => Ok(Backend::Ndk),
            "ndk_platform" => Ok(Backend::NdkPlatform),
            "rust" => Ok(Backend::Rust),
            "cpp-analyzer" => Ok(Backend::CppAnalyzer),
            _ => Err(format!("unknown backend `{}`", s)),
        }
    }
}

/// `backend.<lang>` table of an interface declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendToggle {
    pub enabled: Option<bool>,
}

/// The `backend` table of an interface declaration.
///
/// Every backend is enabled unless explicitly disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendsConfig {
    pub cpp: BackendToggle,
    pub java: BackendToggle,
    pub ndk: BackendToggle,
    pub rust: BackendToggle,
}

impl BackendsConfig {
    /// Whether the given backend is generated.
    pub fn is_enabled(&self, backend: Backend) -> bool {
        let toggle = match backend {
            Backend::Cpp | Backend::CppAnalyzer => &self.cpp,
            Backend::Java => &self.java,
            Backend::Ndk | Backend::NdkPlatform => &self.ndk,
            Backend::Rust => &self.rust,
        };
        toggle.enabled.unwrap_or(true)
    }

    /// Enabled backends in a stable order, with `ndk_platform` following `ndk`
    /// when requested.
    pub fn enabled(&self, with_ndk_platform: bool) -> Vec<Backend> {
        let mut out = Vec::new();
        for backend in Backend::DECLARABLE {
            if !self.is_enabled(backend) {
                continue;
            }
            out.push(backend);
            if backend == Backend::Ndk && with_ndk_platform {
                out.push(Backend::NdkPlatform);
            }
        }
        out
    }
}
