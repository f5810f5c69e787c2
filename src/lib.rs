//! Keel Plugin Host - plugin invocation bridge
//!
//! This crate implements the bridge that lets an out-of-process, sandboxed
//! build-tool plugin ask the Keel package manager to run a build, run
//! tests, or extract a symbol graph, and receive a structured,
//! asynchronously delivered result. Each request runs as an independent
//! unit of work and resolves its completion callback exactly once.

pub mod host;
pub mod invocation;
pub mod mock;
pub mod output;
pub mod process;

pub use keel_plugin_protocol as protocol;

pub use invocation::{HostContext, InvocationDelegate, InvocationError};
pub use output::{LineBufferer, OutputTee, SharedBuffer, SharedStream};
pub use process::{ProcessInvocation, ProcessOutcome, ProcessRunner, SystemProcessRunner};
