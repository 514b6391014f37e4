//! Concurrent fan-out over matrix cells.
//!
//! [`Orchestrator`] spawns one task per [`CheckConfiguration`] on a
//! [`JoinSet`] and folds the results into a [`MatrixReport`]. By default every
//! configuration runs to completion and every failure is collected. With
//! fail-fast enabled, the first failure aborts the remaining tasks and they
//! are reported as cancelled.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};

use crate::config::CheckConfiguration;
use crate::error::{MatrixError, MatrixResult};
use crate::report::{ConfigurationOutcome, ConfigurationReport, MatrixReport};
use crate::runner::MatrixRunner;

/// Runs every configuration concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    runner: MatrixRunner,
    fail_fast: bool,
}

impl Orchestrator {
    pub fn new(runner: MatrixRunner) -> Self {
        Self {
            runner,
            fail_fast: false,
        }
    }

    /// Cancel sibling configurations once one fails.
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Check all `configurations` and report each outcome in input order.
    pub async fn run(&self, configurations: &[CheckConfiguration]) -> MatrixReport {
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            configurations = configurations.len(),
            fail_fast = self.fail_fast,
            "starting feature matrix"
        );

        let mut join_set = JoinSet::new();
        let mut task_index = HashMap::new();
        for (idx, configuration) in configurations.iter().cloned().enumerate() {
            let runner = self.runner.clone();
            let span = info_span!("featcheck.configuration", configuration = %configuration.label());
            let handle = join_set.spawn(
                async move {
                    let task_start = Instant::now();
                    let result = runner.run(&configuration).await;
                    (idx, result, task_start.elapsed().as_millis() as u64)
                }
                .instrument(span),
            );
            task_index.insert(handle.id(), idx);
        }

        let mut slots: Vec<Option<ConfigurationReport>> = vec![None; configurations.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result, duration_ms)) => {
                    let outcome = self.outcome_of(&configurations[idx], result);
                    if !outcome.is_passed() && self.fail_fast {
                        join_set.abort_all();
                    }
                    slots[idx] = Some(ConfigurationReport::new(
                        &configurations[idx],
                        outcome,
                        duration_ms,
                    ));
                }
                Err(join_error) => {
                    let Some(&idx) = task_index.get(&join_error.id()) else {
                        continue;
                    };
                    let outcome = if join_error.is_cancelled() {
                        ConfigurationOutcome::Cancelled
                    } else {
                        let err = MatrixError::TaskJoin(join_error.to_string());
                        error!(configuration = %configurations[idx], error = %err, "configuration task panicked");
                        if self.fail_fast {
                            join_set.abort_all();
                        }
                        ConfigurationOutcome::from_error(&err)
                    };
                    slots[idx] = Some(ConfigurationReport::new(&configurations[idx], outcome, 0));
                }
            }
        }

        let configurations: Vec<ConfigurationReport> = slots
            .into_iter()
            .zip(configurations)
            .map(|(slot, configuration)| {
                slot.unwrap_or_else(|| {
                    ConfigurationReport::new(configuration, ConfigurationOutcome::Cancelled, 0)
                })
            })
            .collect();

        let report = MatrixReport {
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            configurations,
        };
        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            duration_ms = report.duration_ms,
            "feature matrix finished"
        );
        report
    }

    fn outcome_of(
        &self,
        configuration: &CheckConfiguration,
        result: MatrixResult<usize>,
    ) -> ConfigurationOutcome {
        match result {
            Ok(checked) => ConfigurationOutcome::Passed { checked },
            Err(err) => {
                error!(configuration = %configuration, error = %err, "configuration failed");
                ConfigurationOutcome::from_error(&err)
            }
        }
    }
}
