// Process execution behind a trait so compose invocations can be recorded in tests

use crate::errors::Result;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: &str, args: Vec<String>, cwd: &Path) -> Self {
        Self {
            program: program.to_string(),
            args,
            cwd: cwd.to_path_buf(),
            envs: Vec::new(),
        }
    }

    pub fn with_envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs = envs;
        self
    }

    /// Human-readable form, for logs and error messages only
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: &str) -> Self {
        Self {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run with inherited stdio (used for following logs); returns success
    fn run_attached(&self, invocation: &Invocation) -> Result<bool>;
}

/// Runs commands on the host with std::process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        command
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), "running");

        let output = Self::command(invocation).stdin(Stdio::null()).output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn run_attached(&self, invocation: &Invocation) -> Result<bool> {
        debug!(command = %invocation.display(), "running attached");

        let status = Self::command(invocation).status()?;
        Ok(status.success())
    }
}
