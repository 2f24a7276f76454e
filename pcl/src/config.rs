//! promloader configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::templates::DEFAULT_OUTPUT_ROOT;

/// Config file looked for in the working directory
pub const LOCAL_CONFIG: &str = ".promloader.yml";

/// Name of the context whose fixtures are unit-tested and never uploaded
pub const DEFAULT_UNIT_TEST_CONTEXT: &str = "unittest";

/// Main promloader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Parent directory for per-context expansion output
    #[serde(rename = "output-root")]
    pub output_root: PathBuf,

    /// Context expanded for unit tests only
    #[serde(rename = "unit-test-context")]
    pub unit_test_context: String,

    /// Explicit promtool executable; looked up in PATH when unset
    pub promtool: Option<PathBuf>,

    /// Time limit for a single promtool invocation
    #[serde(rename = "check-timeout-ms")]
    pub check_timeout_ms: u64,

    /// Leave expansion output on disk after the run
    #[serde(rename = "keep-output")]
    pub keep_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            unit_test_context: DEFAULT_UNIT_TEST_CONTEXT.to_string(),
            promtool: None,
            check_timeout_ms: 60_000,
            keep_output: false,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load and validate. Otherwise the first
    /// candidate file that does is used, and defaults when none does.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).wrap_err_with(|| format!("Failed to load config from {}", path.display()));
        }

        for path in Self::candidates().iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Ignoring config {}: {:#}", path.display(), e),
            }
        }

        debug!("No usable config file found, using defaults");
        Ok(Self::default())
    }

    /// `.promloader.yml` in the working directory, then the user config dir
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("promloader").join("promloader.yml"));
        }
        paths
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Reject values the run could not work with
    pub fn validate(&self) -> Result<()> {
        if self.output_root.as_os_str().is_empty() {
            return Err(eyre!("output-root must not be empty"));
        }

        let ctx = self.unit_test_context.as_str();
        if ctx.is_empty() || ctx == "." || ctx == ".." || ctx.contains(['/', '\\']) {
            return Err(eyre!("unit-test-context '{}' cannot be used as a directory name", ctx));
        }

        if self.check_timeout_ms == 0 {
            return Err(eyre!("check-timeout-ms must be greater than zero"));
        }

        if let Some(level) = &self.log_level {
            level
                .parse::<tracing::Level>()
                .map_err(|_| eyre!("log-level '{}' is not one of trace, debug, info, warn, error", level))?;
        }

        if self.promtool.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(eyre!("promtool must not be empty when set"));
        }

        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }
}
