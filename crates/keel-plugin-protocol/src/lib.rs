//! Keel Plugin Protocol Types
//!
//! Defines the request and result shapes exchanged between a sandboxed
//! build-tool plugin and the Keel plugin host. Plugins ask the host to run
//! builds, run tests, or extract symbol graphs; the host answers with the
//! structured results defined here.
//!
//! All enums are closed: every consumer matches exhaustively, and no
//! "unknown" fallthrough state is representable.

pub mod build;
pub mod envelope;
pub mod symbols;
pub mod test;

pub use build::{
    ArtifactKind, BuildConfiguration, BuildLogVerbosity, BuildRequest, BuildResult, BuildSubset,
    BuiltArtifact,
};
pub use envelope::{InvocationRequest, InvocationResponse};
pub use symbols::{AccessLevel, SymbolGraphOptions, SymbolGraphRequest, SymbolGraphResult};
pub use test::{
    TestCaseResult, TestOutcome, TestRequest, TestResult, TestStatus, TestSubset, TestTargetResult,
};
