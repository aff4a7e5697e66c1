//! Command-line arguments and their overrides on top of the loaded config.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ReportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "usage-report")]
#[command(version)]
#[command(about = "Aggregate JSON usage logs into an operating system, Python version, error and client session report")]
pub struct Args {
    /// Directory holding the *.json result files and the matches file
    pub data_dir: Option<PathBuf>,

    /// TOML config file; command-line flags override its values
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Matches file (newline-delimited JSON), relative to the data directory
    #[arg(long)]
    pub matches: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Fail on result files that have no `results` key
    #[arg(long)]
    pub strict_results: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply_to(&self, mut config: ReportConfig) -> ReportConfig {
        if let Some(dir) = &self.data_dir {
            config.data_directory = dir.clone();
        }
        if let Some(matches) = &self.matches {
            config.matches_file = matches.clone();
        }
        if self.strict_results {
            config.strict_results = true;
        }
        config
    }
}
