//! CLI argument parsing for pcl

use clap::Parser;
use std::path::PathBuf;

/// Template-expand Prometheus rules per context, check them with promtool,
/// and upload them as PrometheusRule documents
#[derive(Parser, Debug)]
#[command(name = "pcl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding rule templates, *.vars files and tests/
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Comma-separated list of contexts to push configuration to
    #[arg(long, value_delimiter = ',', default_value = "")]
    pub contexts: Vec<String>,

    /// Name of the prometheus to push configuration for
    #[arg(long, default_value = "")]
    pub prometheus: String,

    /// Namespace to create PrometheusRule objects in
    #[arg(long, default_value = "")]
    pub namespace: String,

    /// Skip uploading, print the resulting PrometheusRuleList to stdout instead
    #[arg(long)]
    pub dry_run: bool,

    /// Bypass syntax checks of the rendered rule files
    #[arg(long)]
    pub skip_syntax_check: bool,

    /// Bypass running promtool unit tests
    #[arg(long)]
    pub skip_unit_tests: bool,

    /// Parent directory for expansion output
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Directory to store uploaded PrometheusRule objects in
    #[arg(long)]
    pub sink_dir: Option<PathBuf>,

    /// Leave expansion output on disk after the run
    #[arg(long)]
    pub keep_output: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Requested contexts with empty entries dropped
    pub fn context_list(&self) -> Vec<String> {
        self.contexts
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }
}
