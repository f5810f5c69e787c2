//! Build request and result types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a plugin asks the host to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildSubset {
    /// Everything in the package graph, optionally including test products.
    All { including_tests: bool },
    /// Exactly one named product.
    Product { name: String },
    /// Exactly one named target.
    Target { name: String },
}

/// Build configuration requested by the plugin.
///
/// `Inherit` keeps whatever configuration the host is currently building
/// with; `Debug`/`Release` override it for this request only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildConfiguration {
    Debug,
    Release,
    Inherit,
}

/// How much build log output the plugin wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLogVerbosity {
    #[default]
    Concise,
    Verbose,
    Debug,
}

/// A plugin's request to run a build.
///
/// Extra flags are ordered and appended to the host's own flags for each
/// tool category; they never replace them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub subset: BuildSubset,
    pub configuration: BuildConfiguration,
    #[serde(default)]
    pub extra_c_flags: Vec<String>,
    #[serde(default)]
    pub extra_cxx_flags: Vec<String>,
    #[serde(default)]
    pub extra_swift_flags: Vec<String>,
    #[serde(default)]
    pub extra_linker_flags: Vec<String>,
    #[serde(default)]
    pub verbosity: BuildLogVerbosity,
    /// Mirror the build log live to the user-visible stream in addition to
    /// capturing it into the result.
    #[serde(default)]
    pub echo_logs: bool,
}

/// Kind of a built artifact.
///
/// Products of any other type produce no artifact at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    StaticLibrary,
    DynamicLibrary,
    Executable,
}

/// One artifact produced by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltArtifact {
    /// Absolute path to the artifact on disk.
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Result of a build request.
///
/// A failed build is an expected, reportable outcome: it comes back with
/// `succeeded = false` rather than through the failure channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub succeeded: bool,
    /// Captured build log text (the in-memory capture, not the echo).
    pub log_text: String,
    /// Artifacts in package-graph declaration order.
    pub artifacts: Vec<BuiltArtifact>,
}
