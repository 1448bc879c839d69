//! `runbook-test` — headless test executor binary.
//!
//! Thin entry point: parse arguments, fan runbooks out across tokio tasks,
//! aggregate results, and render the chosen report format.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use runbook_config::{load_test_plan, validate_plan};
use runbook_exec::Executor;
use runbook_report::{render_junit, render_text, RunbookReport};

mod cli;
mod logging;

use cli::{Cli, ReporterFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build Tokio runtime: {err:?}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(all_passed) => {
            if all_passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    if cli.list {
        for path in &cli.runbooks {
            print_dry_run(path)?;
        }
        return Ok(true);
    }

    // Spec §5 "Multiple runbook test suites run in parallel by default" —
    // each runbook gets its own task; a `parallelizable: false` runbook just
    // serializes its own cases inside `Executor::run_case`'s caller below.
    let mut tasks = Vec::with_capacity(cli.runbooks.len());
    for path in cli.runbooks.clone() {
        let override_timeout = cli.timeout.clone();
        tasks.push(tokio::spawn(async move { run_runbook(&path, override_timeout).await }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await.context("runbook task panicked")??);
    }

    let rendered = match cli.reporter {
        ReporterFormat::Text => render_text(&reports, cli.verbose),
        ReporterFormat::Junit => render_junit(&reports).context("failed to render JUnit report")?,
    };

    match &cli.output {
        Some(path) => std::fs::write(path, &rendered).with_context(|| format!("failed to write report to {}", path.display()))?,
        None => print!("{rendered}"),
    }

    Ok(runbook_report::all_passed(&reports))
}

async fn run_runbook(path: &Path, override_timeout: Option<String>) -> Result<RunbookReport> {
    let name = path.display().to_string();
    let document_source = std::fs::read_to_string(path).with_context(|| format!("failed to read runbook {}", path.display()))?;
    let runbook_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let plan_path = cli::test_plan_path(path);
    let plan_source = std::fs::read_to_string(&plan_path)
        .with_context(|| format!("failed to read test plan {}", plan_path.display()))?;
    let plan = load_test_plan(&plan_source).with_context(|| format!("failed to parse test plan {}", plan_path.display()))?;

    let plan_errors = validate_plan(&plan);
    if !plan_errors.is_empty() {
        for error in &plan_errors {
            tracing::error!(runbook = %name, %error, "test plan rejected");
        }
        anyhow::bail!("test plan {} failed validation ({} issue(s))", plan_path.display(), plan_errors.len());
    }

    let mut settings = plan.settings.clone();
    if let Some(timeout) = override_timeout {
        let requested = runbook_config::parse_duration(&timeout).with_context(|| format!("invalid --timeout value `{timeout}`"))?;
        let current = runbook_config::parse_duration(&settings.timeout).unwrap_or(runbook_config::DEFAULT_CASE_TIMEOUT);
        if requested > current {
            settings.timeout = timeout;
        }
    }

    let executor = Executor::build(&document_source, runbook_dir);

    let mut results = Vec::with_capacity(plan.tests.len());
    for case in &plan.tests {
        results.push(executor.run_case(&settings, case).await);
    }

    Ok(RunbookReport::new(name, results))
}

fn print_dry_run(path: &Path) -> Result<()> {
    let document_source = std::fs::read_to_string(path).with_context(|| format!("failed to read runbook {}", path.display()))?;
    let runbook_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let executor = Executor::build(&document_source, runbook_dir);

    println!("{}", path.display());
    for block in executor.registry.iter() {
        println!("  {:?} {}", block.block_type, block.id);
    }
    if executor.config_errors.is_empty() {
        println!("  no config errors");
    } else {
        for error in &executor.config_errors {
            println!("  config error: {error}");
        }
    }
    Ok(())
}
