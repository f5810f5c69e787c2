//! Mock collaborators for testing the plugin invocation bridge.
//!
//! Each double is scripted up front and records what the bridge asked of
//! it, so tests can drive every request kind in-process without a real
//! build system or toolchain:
//!
//! - [`MockBuildSystemProvider`]: scripted build outputs, records created
//!   instances and build calls, writes canned log bytes to each request's
//!   output stream
//! - [`MockPackageGraph`]: configurable root products
//! - [`MockToolchain`]: fixed tool paths
//! - [`MockProcessRunner`]: programmable responder plus an ordered record
//!   of every invocation
//! - [`RecordingSink`]: collects tagged diagnostics and progress lines

mod build_system;
mod host;
mod observability;
mod process;

pub use build_system::{BuildRecord, CreationRecord, MockBuildSystemProvider};
pub use host::{MockPackageGraph, MockToolchain};
pub use observability::RecordingSink;
pub use process::MockProcessRunner;
