//! In-memory build tool (testing only)
//!
//! [`ScriptedTool`] records every invocation it receives and answers with
//! canned outputs, so runner and orchestrator behaviour can be checked
//! without spawning cargo.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::invocation::Invocation;
use crate::tool::{BuildTool, InvocationOutput};

type Matcher = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

struct FailRule {
    matcher: Matcher,
    output: InvocationOutput,
}

/// Build tool fake that succeeds unless a failure rule matches.
#[derive(Default)]
pub struct ScriptedTool {
    rules: Vec<FailRule>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Invocation>>,
}

impl std::fmt::Debug for ScriptedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTool")
            .field("rules", &self.rules.len())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `exit_code`/`stderr` for every invocation matching `matcher`.
    ///
    /// Rules are tried in insertion order; the first match wins.
    pub fn fail_when<F>(mut self, matcher: F, exit_code: i32, stderr: &str) -> Self
    where
        F: Fn(&Invocation) -> bool + Send + Sync + 'static,
    {
        self.rules.push(FailRule {
            matcher: Box::new(matcher),
            output: InvocationOutput::failure(exit_code, stderr.as_bytes()),
        });
        self
    }

    /// Sleep this long before answering a successful invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every invocation received so far, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildTool for ScriptedTool {
    async fn run(&self, invocation: &Invocation) -> std::io::Result<InvocationOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        if let Some(rule) = self.rules.iter().find(|r| (r.matcher)(invocation)) {
            return Ok(rule.output.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(InvocationOutput::success())
    }
}
