//! Build tool execution.
//!
//! [`BuildTool`] is the seam between the matrix runner and the outside world.
//! [`ProcessTool`] spawns real subprocesses; tests plug in
//! [`crate::fakes::ScriptedTool`].

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::invocation::Invocation;

/// Outcome of one build tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,

    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl InvocationOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            stderr: Vec::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stderr: stderr.into(),
        }
    }

    /// Whether the call passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one invocation to completion.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Execute `invocation` and wait for it to exit.
    ///
    /// An `Err` means the process could not be run at all; a non-zero exit
    /// is reported through [`InvocationOutput::exit_code`].
    async fn run(&self, invocation: &Invocation) -> std::io::Result<InvocationOutput>;
}

/// Spawns the build tool as a child process.
///
/// Standard output is inherited so build progress stays visible; standard
/// error is captured for failure reports.
#[derive(Debug, Clone, Default)]
pub struct ProcessTool {
    current_dir: Option<PathBuf>,
}

impl ProcessTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every invocation from `dir` (the checked crate's root).
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl BuildTool for ProcessTool {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<InvocationOutput> {
        let start = Instant::now();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        // wait_with_output drains stderr fully before returning.
        let output = command.spawn()?.wait_with_output().await?;

        debug!(
            command = %invocation,
            exit_code = ?output.status.code(),
            duration_ms = start.elapsed().as_millis() as u64,
            "build tool exited"
        );

        Ok(InvocationOutput {
            exit_code: output.status.code(),
            stderr: output.stderr,
        })
    }
}
