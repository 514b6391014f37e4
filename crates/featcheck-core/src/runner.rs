//! Per-configuration feature matrix execution.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::CheckConfiguration;
use crate::error::{MatrixError, MatrixResult};
use crate::invocation::Invocation;
use crate::tool::BuildTool;

/// Checks every feature subset of one configuration, one invocation at a time.
///
/// The first failing subset aborts the configuration; later subsets are not
/// attempted.
#[derive(Clone)]
pub struct MatrixRunner {
    tool: Arc<dyn BuildTool>,
    program: String,
    timeout_secs: u64,
}

impl MatrixRunner {
    pub fn new(tool: Arc<dyn BuildTool>, program: impl Into<String>) -> Self {
        Self {
            tool,
            program: program.into(),
            timeout_secs: 0,
        }
    }

    /// Limit every invocation to `secs` seconds (`0` disables the limit).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The invocations [`MatrixRunner::run`] would issue, in order.
    pub fn plan(&self, configuration: &CheckConfiguration) -> Vec<Invocation> {
        configuration
            .subsets()
            .iter()
            .map(|subset| Invocation::for_subset(&self.program, configuration, subset))
            .collect()
    }

    /// Check every subset of `configuration`.
    ///
    /// Returns the number of invocations that passed, which is the full
    /// subset count on success.
    pub async fn run(&self, configuration: &CheckConfiguration) -> MatrixResult<usize> {
        let label = configuration.label();
        let plan = self.plan(configuration);
        let total = plan.len();

        info!(
            configuration = %label,
            features = configuration.features().len(),
            subsets = total,
            "checking configuration"
        );

        for (index, invocation) in plan.into_iter().enumerate() {
            let start = Instant::now();
            debug!(
                configuration = %label,
                step = index + 1,
                of = total,
                features = invocation.features_flag().unwrap_or(""),
                "running check"
            );

            let pending = self.tool.run(&invocation);
            let result = if self.timeout_secs > 0 {
                let limit = Duration::from_secs(self.timeout_secs);
                tokio::time::timeout(limit, pending).await.ok()
            } else {
                Some(pending.await)
            };

            let Some(result) = result else {
                warn!(configuration = %label, command = %invocation, "check timed out");
                return Err(MatrixError::TimedOut {
                    configuration: label,
                    invocation,
                    timeout_secs: self.timeout_secs,
                });
            };

            let output = match result {
                Ok(output) => output,
                Err(source) => return Err(MatrixError::Spawn { invocation, source }),
            };

            if !output.passed() {
                warn!(
                    configuration = %label,
                    command = %invocation,
                    exit_code = ?output.exit_code,
                    "check failed"
                );
                return Err(MatrixError::InvocationFailed {
                    configuration: label,
                    invocation,
                    exit_code: output.exit_code,
                    stderr: output.stderr,
                });
            }

            debug!(
                configuration = %label,
                duration_ms = start.elapsed().as_millis() as u64,
                "check passed"
            );
        }

        info!(configuration = %label, subsets = total, "configuration passed");
        Ok(total)
    }
}
