//! Build tool command lines.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CheckConfiguration;

/// Subcommand run for every subset.
pub const CHECK_VERB: &str = "check";

/// Disables the crate's default features so only the subset is active.
pub const NO_DEFAULT_FEATURES: &str = "--no-default-features";

/// Restricts the check to example targets.
pub const EXAMPLES_FLAG: &str = "--examples";

/// A single build tool call: program plus full argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Executable to run.
    pub program: String,

    /// Arguments, in order.
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build the check invocation of `configuration` for one feature subset.
    ///
    /// Produces
    /// `+<toolchain> check --no-default-features --examples [--features=a,b] [--target=t]`.
    /// The `--features` flag is left out when `subset` is empty.
    pub fn for_subset(program: &str, configuration: &CheckConfiguration, subset: &[String]) -> Self {
        let mut args = vec![
            format!("+{}", configuration.toolchain()),
            CHECK_VERB.to_string(),
            NO_DEFAULT_FEATURES.to_string(),
            EXAMPLES_FLAG.to_string(),
        ];
        if !subset.is_empty() {
            args.push(format!("--features={}", subset.join(",")));
        }
        if let Some(target) = configuration.target() {
            args.push(format!("--target={target}"));
        }
        Self::new(program, args)
    }

    /// Value of the `--features=` flag, if present.
    pub fn features_flag(&self) -> Option<&str> {
        self.args
            .iter()
            .find_map(|arg| arg.strip_prefix("--features="))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
