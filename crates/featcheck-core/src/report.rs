//! Matrix run results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CheckConfiguration;
use crate::error::MatrixError;

/// How one configuration ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfigurationOutcome {
    /// Every subset passed.
    Passed { checked: usize },

    /// A subset failed or could not be run.
    Failed {
        /// Full error text, including captured stderr.
        error: String,

        /// Command line of the failing call, when there was one.
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },

    /// Stopped because a sibling configuration failed first.
    Cancelled,
}

impl ConfigurationOutcome {
    pub fn from_error(error: &MatrixError) -> Self {
        Self::Failed {
            error: error.to_string(),
            command: error.invocation().map(ToString::to_string),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Result of one matrix cell.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationReport {
    /// `toolchain` or `toolchain/target`.
    pub configuration: String,

    pub toolchain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub outcome: ConfigurationOutcome,

    /// Wall time spent on this configuration.
    pub duration_ms: u64,
}

impl ConfigurationReport {
    pub fn new(
        configuration: &CheckConfiguration,
        outcome: ConfigurationOutcome,
        duration_ms: u64,
    ) -> Self {
        Self {
            configuration: configuration.label(),
            toolchain: configuration.toolchain().to_string(),
            target: configuration.target().map(str::to_string),
            outcome,
            duration_ms,
        }
    }
}

/// Result of a whole matrix run, in launch order.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,

    pub configurations: Vec<ConfigurationReport>,
}

impl MatrixReport {
    /// `true` only when every configuration passed.
    pub fn success(&self) -> bool {
        self.configurations.iter().all(|c| c.outcome.is_passed())
    }

    pub fn passed_count(&self) -> usize {
        self.configurations
            .iter()
            .filter(|c| c.outcome.is_passed())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.configurations
            .iter()
            .filter(|c| c.outcome == ConfigurationOutcome::Cancelled)
            .count()
    }

    /// Total invocations that passed across all configurations that passed.
    pub fn checked_count(&self) -> usize {
        self.configurations
            .iter()
            .map(|c| match c.outcome {
                ConfigurationOutcome::Passed { checked } => checked,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConfigurationReport> {
        self.configurations
            .iter()
            .filter(|c| matches!(c.outcome, ConfigurationOutcome::Failed { .. }))
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.success() {
            format!(
                "all {} configurations passed ({} checks)",
                self.configurations.len(),
                self.checked_count()
            )
        } else {
            format!(
                "{} of {} configurations failed ({} passed, {} cancelled)",
                self.failed_count(),
                self.configurations.len(),
                self.passed_count(),
                self.cancelled_count()
            )
        }
    }
}
