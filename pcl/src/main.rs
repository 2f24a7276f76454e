//! pcl - Prometheus rule template expansion and loading
//!
//! CLI entry point: expands a rule source directory per context, checks it
//! with promtool and uploads the resulting PrometheusRule documents.

use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use promloader::cli::Cli;
use promloader::config::Config;
use promloader::pipeline::{ContextOutcome, RunReport};
use promloader::templates::{ExpansionConfig, ExpansionEngine};
use promloader::{DirectorySink, Pipeline, Promtool, RunOptions};

fn setup_logging(level: Option<&str>) -> Result<()> {
    let level: tracing::Level = match level {
        Some(level) => level
            .parse()
            .map_err(|_| eyre::eyre!("Invalid log level: {}", level))?,
        None => tracing::Level::INFO,
    };

    // Logs go to stderr; stdout is reserved for dry-run output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let log_level = cli.log_level.as_deref().or(config.log_level.as_deref());
    setup_logging(log_level).context("Failed to setup logging")?;

    if !cli.dry_run && cli.sink_dir.is_none() {
        return Err(eyre::eyre!("--sink-dir is required unless --dry-run is given"));
    }

    let output_root = cli.output_root.clone().unwrap_or_else(|| config.output_root.clone());
    let mut pipeline = Pipeline::new(ExpansionEngine::new(ExpansionConfig::with_root(output_root)));

    if !(cli.skip_syntax_check && cli.skip_unit_tests) {
        let promtool = match &config.promtool {
            Some(path) => Promtool::new(path),
            None => Promtool::find().context("Failed to find promtool")?,
        };
        info!("Using promtool at {}", promtool.executable().display());
        pipeline = pipeline.with_checker(Arc::new(promtool.with_timeout(config.check_timeout())));
    }

    if let Some(dir) = &cli.sink_dir {
        pipeline = pipeline.with_sink(Arc::new(DirectorySink::new(dir)));
    }

    let options = RunOptions {
        source_dir: cli.source_dir.clone(),
        contexts: cli.context_list(),
        unit_test_context: config.unit_test_context.clone(),
        prometheus: cli.prometheus.clone(),
        namespace: cli.namespace.clone(),
        dry_run: cli.dry_run,
        skip_syntax_check: cli.skip_syntax_check,
        skip_unit_tests: cli.skip_unit_tests,
        keep_output: cli.keep_output || config.keep_output,
    };

    let report = pipeline.run(&options).await?;
    print_report(&report)
}

/// Print dry-run documents to stdout and a per-context summary to stderr
fn print_report(report: &RunReport) -> Result<()> {
    for ctx in &report.contexts {
        if let ContextOutcome::DryRun(list) = &ctx.outcome {
            let json = serde_json::to_string_pretty(list).context("Marshalling to JSON failed")?;
            println!("{}", json);
        }
    }

    eprintln!(
        "{} {} file(s) checked, {} unit test file(s) run",
        "✓".green(),
        report.files_checked,
        report.tests_run
    );
    for ctx in &report.contexts {
        match &ctx.outcome {
            ContextOutcome::UnitTestOnly => eprintln!("  {} {}", ctx.context.cyan(), "unit tests only".dimmed()),
            ContextOutcome::DryRun(list) => {
                eprintln!("  {} {} document(s) (dry run)", ctx.context.cyan(), list.items.len())
            }
            ContextOutcome::Uploaded(summary) => eprintln!(
                "  {} {} created, {} updated",
                ctx.context.cyan(),
                summary.created.len(),
                summary.updated.len()
            ),
            ContextOutcome::Skipped(reason) => {
                eprintln!("  {} {} {}", ctx.context.cyan(), "skipped:".yellow(), reason)
            }
        }
    }

    Ok(())
}
