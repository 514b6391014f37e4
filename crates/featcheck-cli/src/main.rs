//! featcheck - check every cargo feature combination
//!
//! Runs `cargo +<toolchain> check --no-default-features --examples` for every
//! subset of the declared features, on every (toolchain, target) cell of the
//! matrix. Cells run concurrently; the process exits non-zero if any fails.
//!
//! The matrix comes from `--config` (TOML) or the built-in default, and can be
//! narrowed or widened with `--features`, `--mandatory`, `--toolchain` and
//! `--target`.

use anyhow::{Context, Result};
use clap::Parser;
use featcheck_core::{
    CheckConfiguration, ConfigurationOutcome, MatrixCell, MatrixConfig, MatrixReport,
    MatrixRunner, Orchestrator, ProcessTool,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "featcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check that a crate builds under every feature combination", long_about = None)]
struct Cli {
    /// Matrix file (TOML); the built-in matrix is used when omitted
    #[arg(short, long, env = "FEATCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Build tool executable
    #[arg(long, env = "FEATCHECK_TOOL")]
    tool: Option<String>,

    /// Optional features to combine (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Features enabled in every combination (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    mandatory: Option<Vec<String>>,

    /// Toolchains to check (repeatable); replaces the matrix toolchains,
    /// keeping the matrix targets
    #[arg(long = "toolchain")]
    toolchains: Vec<String>,

    /// Extra target triples (repeatable); the host is always checked too
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Directory of the crate to check (default: current directory)
    #[arg(long, env = "FEATCHECK_MANIFEST_DIR")]
    manifest_dir: Option<PathBuf>,

    /// Per-invocation timeout in seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "FEATCHECK_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Cancel the remaining configurations after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Print the planned invocations without running them
    #[arg(long)]
    dry_run: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    report_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    featcheck_core::init_tracing(cli.json, level);

    let matrix = resolve_matrix(&cli)?;
    let configurations = matrix
        .configurations()
        .context("Invalid feature matrix")?;

    let mut tool = ProcessTool::new();
    if let Some(dir) = &cli.manifest_dir {
        tool = tool.with_current_dir(dir);
    }
    let runner =
        MatrixRunner::new(Arc::new(tool), matrix.tool.clone()).with_timeout(cli.timeout_secs);

    if cli.dry_run {
        print_plan(&runner, &configurations);
        return Ok(());
    }

    info!(
        tool = %matrix.tool,
        features = ?matrix.features,
        cells = configurations.len(),
        "Running feature matrix"
    );

    let report = Orchestrator::new(runner)
        .fail_fast(cli.fail_fast)
        .run(&configurations)
        .await;

    finish(&report, cli.report_json)
}

/// Load the matrix file (or the default) and apply command-line overrides.
fn resolve_matrix(cli: &Cli) -> Result<MatrixConfig> {
    let mut matrix = match &cli.config {
        Some(path) => MatrixConfig::load(path)
            .with_context(|| format!("Failed to load matrix from {:?}", path))?,
        None => MatrixConfig::default(),
    };

    if let Some(tool) = &cli.tool {
        matrix.tool = tool.clone();
    }
    if let Some(features) = &cli.features {
        matrix.features = non_empty(features);
    }
    if let Some(mandatory) = &cli.mandatory {
        matrix.mandatory = non_empty(mandatory);
    }
    if !cli.toolchains.is_empty() || !cli.targets.is_empty() {
        matrix.cells = override_cells(&matrix.cells, &cli.toolchains, &cli.targets);
    }

    Ok(matrix)
}

/// `--features ""` means "no features", not one empty name.
fn non_empty(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Rebuild the cells as toolchains x targets.
///
/// Toolchains not given on the command line are taken from `cells`. Without
/// `--target` the targets of `cells` are kept as they are (host included only
/// if `cells` had a host cell); with `--target` the host is checked as well.
fn override_cells(
    cells: &[MatrixCell],
    toolchains: &[String],
    extra_targets: &[String],
) -> Vec<MatrixCell> {
    let mut toolchains: Vec<String> = toolchains.to_vec();
    if toolchains.is_empty() {
        for cell in cells {
            if !toolchains.contains(&cell.toolchain) {
                toolchains.push(cell.toolchain.clone());
            }
        }
    }

    let mut targets: Vec<Option<String>> = Vec::new();
    if extra_targets.is_empty() {
        for cell in cells {
            if !targets.contains(&cell.target) {
                targets.push(cell.target.clone());
            }
        }
    } else {
        targets.push(None);
        targets.extend(extra_targets.iter().cloned().map(Some));
    }

    targets
        .iter()
        .flat_map(|target| {
            toolchains
                .iter()
                .map(move |toolchain| MatrixCell::new(toolchain.clone(), target.as_deref()))
        })
        .collect()
}

fn print_plan(runner: &MatrixRunner, configurations: &[CheckConfiguration]) {
    for configuration in configurations {
        println!("# {}", configuration.label());
        for invocation in runner.plan(configuration) {
            println!("{}", invocation);
        }
    }
}

fn finish(report: &MatrixReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    for failed in report.failures() {
        eprintln!("\n=== {} ===", failed.configuration);
        if let ConfigurationOutcome::Failed { error, .. } = &failed.outcome {
            eprintln!("{}", error);
        }
    }

    if report.success() {
        info!("{}", report.summary());
        Ok(())
    } else {
        anyhow::bail!("{}", report.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featcheck_core::fakes::ScriptedTool;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["featcheck"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_default_matrix_without_flags() {
        let cli = parse(&[]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert_eq!(matrix, MatrixConfig::default());
    }

    #[test]
    fn test_feature_overrides() {
        let cli = parse(&["--features", "std,serde", "--mandatory", "log", "--tool", "cross"]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert_eq!(matrix.tool, "cross");
        assert_eq!(matrix.features, vec!["std", "serde"]);
        assert_eq!(matrix.mandatory, vec!["log"]);
        assert_eq!(matrix.cells, MatrixConfig::default().cells);
    }

    #[test]
    fn test_empty_features_flag_means_none() {
        let cli = parse(&["--features", ""]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert!(matrix.features.is_empty());
    }

    #[test]
    fn test_toolchain_override_keeps_targets() {
        let cli = parse(&["--toolchain", "beta"]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert_eq!(
            matrix.cells,
            vec![
                MatrixCell::new("beta", None),
                MatrixCell::new("beta", Some("wasm32-unknown-unknown")),
            ]
        );
    }

    #[test]
    fn test_toolchain_override_adds_no_host_cell() {
        let cells = vec![MatrixCell::new("stable", Some("wasm32-unknown-unknown"))];
        assert_eq!(
            override_cells(&cells, &["beta".to_string()], &[]),
            vec![MatrixCell::new("beta", Some("wasm32-unknown-unknown"))]
        );
    }

    #[test]
    fn test_target_override_keeps_toolchains() {
        let cli = parse(&["--target", "thumbv6m-none-eabi"]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert_eq!(
            matrix.cells,
            vec![
                MatrixCell::new("nightly", None),
                MatrixCell::new("stable", None),
                MatrixCell::new("nightly", Some("thumbv6m-none-eabi")),
                MatrixCell::new("stable", Some("thumbv6m-none-eabi")),
            ]
        );
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("featcheck.toml");
        std::fs::write(
            &path,
            "features = [\"a\", \"b\", \"c\"]\n\n[[cell]]\ntoolchain = \"1.70\"\n",
        )
        .expect("write");

        let cli = parse(&["--config", path.to_str().expect("utf-8 path"), "--mandatory", "std"]);
        let matrix = resolve_matrix(&cli).expect("resolve");
        assert_eq!(matrix.features, vec!["a", "b", "c"]);
        assert_eq!(matrix.mandatory, vec!["std"]);
        assert_eq!(matrix.cells, vec![MatrixCell::new("1.70", None)]);
    }

    #[test]
    fn test_missing_config_file_errors() {
        let cli = parse(&["--config", "/nonexistent/featcheck.toml"]);
        let err = resolve_matrix(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("featcheck.toml"));
    }

    #[tokio::test]
    async fn test_finish_fails_on_failed_report() {
        let tool = Arc::new(ScriptedTool::new().fail_when(|_| true, 1, "broken"));
        let configurations = MatrixConfig::default().configurations().expect("configurations");
        let report = Orchestrator::new(MatrixRunner::new(tool, "cargo"))
            .run(&configurations)
            .await;

        assert!(report
            .failures()
            .all(|f| matches!(f.outcome, ConfigurationOutcome::Failed { .. })));
        let err = finish(&report, false).unwrap_err();
        assert!(err.to_string().contains("4 of 4 configurations failed"));
    }

    #[tokio::test]
    async fn test_finish_succeeds_on_clean_report() {
        let tool = Arc::new(ScriptedTool::new());
        let configurations = MatrixConfig::default().configurations().expect("configurations");
        let report = Orchestrator::new(MatrixRunner::new(tool, "cargo"))
            .run(&configurations)
            .await;
        assert!(finish(&report, true).is_ok());
    }
}
