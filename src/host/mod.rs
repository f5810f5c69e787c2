//! Host-side collaborator interfaces for the plugin invocation bridge.
//!
//! The bridge does not resolve manifests, construct build plans, or drive
//! compilers itself; it consumes those capabilities through the narrow
//! traits here. Production implementations live with the Keel build system;
//! the [`crate::mock`] module provides scripted doubles for tests.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by host collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    /// The build system cannot produce an output this request needs.
    #[error("build system cannot produce the requested output: {0}")]
    UnsupportedOutput(String),

    /// The package graph could not be loaded or walked.
    #[error("package graph unavailable: {0}")]
    GraphUnavailable(String),

    /// A required tool is missing from the toolchain.
    #[error("tool '{0}' not found in toolchain")]
    ToolNotFound(String),

    /// Any other internal build-system failure.
    #[error("build system failure: {0}")]
    Internal(String),
}

/// Severity threshold for build log output.
///
/// Variant order is load-bearing: `Debug < Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A structured diagnostic emitted on behalf of a plugin request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic stamped with the current time.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }
}

/// Process-wide sink for plugin-request observability.
///
/// `emit` delivers structured diagnostics synchronously; `progress` carries
/// one complete line of textual build/process output. Both are tagged with
/// the originating plugin's name. Lines within one request arrive in
/// production order; lines from concurrent requests may interleave.
pub trait ObservabilitySink: Send + Sync {
    fn emit(&self, plugin: &str, diagnostic: Diagnostic);
    fn progress(&self, plugin: &str, line: &str);
}

/// Host build configuration. Unlike the plugin-facing request enum there is
/// no `Inherit` here; the host always has a concrete configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    Debug,
    Release,
}

impl Configuration {
    /// Directory name under the build path for this configuration.
    pub fn dir_name(self) -> &'static str {
        match self {
            Configuration::Debug => "debug",
            Configuration::Release => "release",
        }
    }
}

/// Per-tool extra flags, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFlags {
    pub c: Vec<String>,
    pub cxx: Vec<String>,
    pub swift: Vec<String>,
    pub linker: Vec<String>,
}

/// Parameters for one build-system instance.
#[derive(Debug, Clone)]
pub struct BuildParameters {
    pub configuration: Configuration,
    /// Root of the build data directory (e.g. `.build`).
    pub build_path: PathBuf,
    pub flags: ToolFlags,
    /// Minimum severity the build system logs at.
    pub log_level: Severity,
    /// Force test targets to be buildable even outside a test action.
    pub explicit_testability: bool,
    /// Instrument built code for coverage collection.
    pub enable_code_coverage: bool,
    /// Set when a request named a single product; consumed by artifact
    /// filtering.
    pub explicit_product: Option<String>,
}

impl BuildParameters {
    /// Parameters with host defaults rooted at `build_path`.
    pub fn new(build_path: impl Into<PathBuf>) -> Self {
        Self {
            configuration: Configuration::Debug,
            build_path: build_path.into(),
            flags: ToolFlags::default(),
            log_level: Severity::Warning,
            explicit_testability: false,
            enable_code_coverage: false,
            explicit_product: None,
        }
    }

    /// Directory holding built products for the active configuration.
    pub fn configuration_dir(&self) -> PathBuf {
        self.build_path.join(self.configuration.dir_name())
    }

    /// Shared coverage output directory for the active configuration.
    ///
    /// This directory is scoped to a build destination; concurrent test
    /// runs against the same destination are not safe.
    pub fn coverage_directory(&self) -> PathBuf {
        self.configuration_dir().join("codecov")
    }
}

/// Kind of library a library product builds as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Static,
    Dynamic,
    Automatic,
}

/// Type of a declared product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Executable,
    Library(LibraryKind),
    Test,
    Plugin,
    Snippet,
    Macro,
}

/// A product declared by a root package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDescription {
    pub name: String,
    pub package_identity: String,
    pub product_type: ProductType,
}

/// Read access to the resolved package graph.
pub trait PackageGraph: Send + Sync {
    /// Products declared by every root package, in declaration order.
    fn root_products(&self) -> Vec<ProductDescription>;
}

/// Host-side build subset, resolved from a plugin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSubsetSpec {
    AllExcludingTests,
    AllIncludingTests,
    Product(String),
    Target(String),
}

/// Outputs a caller wants from a build beyond the built products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedOutput {
    SymbolGraph,
    BuildPlan,
}

/// A built test product and the binary that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestProduct {
    pub name: String,
    pub binary_path: PathBuf,
}

/// Platform context a module is built for. `Target` is the machine the
/// result runs on; `Host` is the machine running the build. The two differ
/// under cross-compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildDestination {
    Host,
    Target,
}

/// Build description for one module under one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuildDescription {
    pub module_name: String,
    pub package_identity: String,
    pub destination: BuildDestination,
    /// Additional arguments the symbol graph extractor needs to see the
    /// module (search paths, target triple, and the like).
    pub extractor_arguments: Vec<String>,
}

/// The build plan produced alongside a build, when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
    pub descriptions: Vec<ModuleBuildDescription>,
}

/// What a build produced.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub succeeded: bool,
    /// Built test products, present when the subset included tests.
    pub test_products: Vec<TestProduct>,
    /// Directory of a natively produced symbol graph, when the build
    /// system emitted one itself.
    pub symbol_graph_directory: Option<PathBuf>,
    /// Build plan, when requested and available.
    pub build_plan: Option<BuildPlan>,
}

impl BuildOutput {
    /// A successful output with no extras.
    pub fn successful() -> Self {
        Self {
            succeeded: true,
            ..Self::default()
        }
    }
}

/// One build-system instance, created per request and discarded after it.
pub trait BuildSystem: Send {
    fn build(
        &mut self,
        subset: &BuildSubsetSpec,
        outputs: &[RequestedOutput],
    ) -> Result<BuildOutput, HostError>;
}

/// Creates build-system instances.
///
/// The bridge always passes `manifest_caching = false`: every plugin
/// request gets a fresh, uncached instance so concurrent requests cannot
/// bleed configuration into each other.
pub trait BuildSystemProvider: Send + Sync {
    fn create(
        &self,
        parameters: BuildParameters,
        manifest_caching: bool,
        output: Box<dyn Write + Send>,
    ) -> Result<Box<dyn BuildSystem>, HostError>;
}

/// Resolves external tool locations.
pub trait Toolchain: Send + Sync {
    /// Raw coverage data merge tool (llvm-profdata).
    fn coverage_merge_tool(&self) -> Result<PathBuf, HostError>;
    /// Coverage export tool (llvm-cov).
    fn coverage_export_tool(&self) -> Result<PathBuf, HostError>;
    /// External symbol graph extractor.
    fn symbol_graph_extractor(&self) -> Result<PathBuf, HostError>;
}

/// Environment map for spawned test processes. Ordered so constructed
/// environments compare and print deterministically.
pub type Environment = BTreeMap<String, String>;

/// Coverage profile pattern for a coverage directory.
///
/// `%m` is substituted per-module by the instrumented runtime, so several
/// processes can write raw files into the shared directory without
/// clobbering each other.
pub fn coverage_profile_pattern(coverage_dir: &Path) -> String {
    coverage_dir
        .join("default%m.profraw")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_threshold_order() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn coverage_directory_tracks_configuration() {
        let mut parameters = BuildParameters::new("/work/.build");
        assert_eq!(
            parameters.coverage_directory(),
            PathBuf::from("/work/.build/debug/codecov")
        );
        parameters.configuration = Configuration::Release;
        assert_eq!(
            parameters.coverage_directory(),
            PathBuf::from("/work/.build/release/codecov")
        );
    }

    #[test]
    fn profile_pattern_keeps_module_placeholder() {
        let pattern = coverage_profile_pattern(Path::new("/b/debug/codecov"));
        assert_eq!(pattern, "/b/debug/codecov/default%m.profraw");
    }
}
