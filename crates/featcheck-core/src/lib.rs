//! featcheck - exhaustive cargo feature-matrix checking
//!
//! Verifies that a crate compiles under every combination of its optional
//! features, for every (toolchain, target) cell of a matrix:
//! - Enumerates feature subsets ([`powerset`])
//! - Checks the subsets of one cell sequentially, stopping at the first failure ([`MatrixRunner`])
//! - Runs all cells concurrently and collects the outcome ([`Orchestrator`])

pub mod config;
pub mod error;
pub mod fakes;
pub mod invocation;
pub mod orchestrator;
pub mod powerset;
pub mod report;
pub mod runner;
pub mod telemetry;
pub mod tool;

// Re-export key types
pub use config::{CheckConfiguration, FeatureSet, MandatorySet, MatrixCell, MatrixConfig};
pub use error::{MatrixError, MatrixResult};
pub use invocation::Invocation;
pub use orchestrator::Orchestrator;
pub use powerset::{powerset, Powerset};
pub use report::{ConfigurationOutcome, ConfigurationReport, MatrixReport};
pub use runner::MatrixRunner;
pub use telemetry::init_tracing;
pub use tool::{BuildTool, InvocationOutput, ProcessTool};
