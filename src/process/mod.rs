//! External process invocation.
//!
//! The bridge drives several external tools (test binaries, coverage
//! merge/export, the symbol graph extractor) through the [`ProcessRunner`]
//! trait. [`SystemProcessRunner`] is the production implementation;
//! [`crate::mock::MockProcessRunner`] scripts outcomes for tests.

use std::io;
use std::path::PathBuf;
use std::process::Command;

use crate::host::Environment;

/// Environment variable allowlist for spawned test processes.
/// Drop-by-default: only known-safe variables are inherited.
pub const ENV_ALLOWLIST: &[&str] = &[
    "HOME",
    "PATH",
    "TMPDIR",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "TERM",
    "USER",
    "LOGNAME",
];

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    /// When set, the child runs with exactly this environment (the parent
    /// environment is cleared first). When unset, the child inherits.
    pub environment: Option<Environment>,
    pub working_directory: Option<PathBuf>,
}

impl ProcessInvocation {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
            environment: None,
            working_directory: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Display name of the tool for diagnostics: the executable file name.
    pub fn tool_name(&self) -> String {
        self.executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.executable.to_string_lossy().into_owned())
    }
}

/// Captured result of an external tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutcome {
    /// An outcome for a clean exit with the given stdout.
    pub fn succeeded(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// An outcome for a non-zero exit with the given stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Spawns external tools and captures their output.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ProcessOutcome>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ProcessOutcome> {
        let mut command = Command::new(&invocation.executable);
        command.args(&invocation.arguments);
        if let Some(environment) = &invocation.environment {
            command.env_clear();
            command.envs(environment);
        }
        if let Some(working_directory) = &invocation.working_directory {
            command.current_dir(working_directory);
        }
        let output = command.output()?;
        Ok(ProcessOutcome {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Base environment for spawned test processes: the allowlisted subset of
/// the host environment.
pub fn base_environment() -> Environment {
    let mut environment = Environment::new();
    for key in ENV_ALLOWLIST {
        if let Ok(value) = std::env::var(key) {
            environment.insert((*key).to_string(), value);
        }
    }
    environment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_builder_accumulates_arguments() {
        let invocation = ProcessInvocation::new("/usr/bin/llvm-profdata")
            .arg("merge")
            .args(["-sparse", "a.profraw"])
            .arg("-o")
            .arg("default.profdata");
        assert_eq!(
            invocation.arguments,
            vec!["merge", "-sparse", "a.profraw", "-o", "default.profdata"]
        );
        assert_eq!(invocation.tool_name(), "llvm-profdata");
    }

    #[test]
    fn outcome_success_requires_zero_exit() {
        assert!(ProcessOutcome::succeeded(b"ok".to_vec()).success());
        assert!(!ProcessOutcome::failed(2, b"boom".to_vec()).success());
        let signalled = ProcessOutcome {
            exit_code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(!signalled.success());
    }

    #[test]
    fn base_environment_only_contains_allowlisted_keys() {
        for key in base_environment().keys() {
            assert!(
                ENV_ALLOWLIST.contains(&key.as_str()),
                "unexpected environment key: {}",
                key
            );
        }
    }

    #[test]
    #[cfg(unix)]
    fn system_runner_captures_exit_code_and_output() {
        let runner = SystemProcessRunner;
        let invocation = ProcessInvocation::new("/bin/sh")
            .arg("-c")
            .arg("printf out; printf err >&2; exit 3");
        let outcome = runner.run(&invocation).expect("spawn /bin/sh");
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, b"out");
        assert_eq!(outcome.stderr, b"err");
        assert!(!outcome.success());
    }
}
