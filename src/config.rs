//! Report configuration loaded from TOML, with defaults for every field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::SortOrder;
use crate::error::{ReportError, ReportResult};
use crate::events::ResultsPolicy;
use crate::views::{
    default_excluded_titles, ErrorFilter, DEFAULT_CLIENT_PREFIX, DEFAULT_EXCEPTION_SEPARATOR,
    DEFAULT_SESSION_PREFIX,
};

pub const DEFAULT_PROJECT_NAME: &str = "awesome_python_project";
pub const DEFAULT_DATA_DIRECTORY: &str = "./sample-data";
pub const DEFAULT_MATCHES_FILE: &str = "matches.jsonl";
pub const DEFAULT_OS_PATTERN: &str = "os:#";
pub const DEFAULT_PYTHON_PATTERN: &str = "python:#<1>.*";

/// Everything a report run needs. Loaded from TOML; any field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Shown in the report heading.
    pub project_name: String,
    pub data_directory: PathBuf,
    /// Resolved against `data_directory` when relative.
    pub matches_file: PathBuf,
    pub os_pattern: String,
    pub python_pattern: String,
    pub capture_order: SortOrder,
    /// Reject result files without a `results` key instead of treating them as empty.
    pub strict_results: bool,
    pub exception_separator: String,
    pub session_prefix: String,
    pub client_prefix: String,
    pub excluded_titles: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            data_directory: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            matches_file: PathBuf::from(DEFAULT_MATCHES_FILE),
            os_pattern: DEFAULT_OS_PATTERN.to_string(),
            python_pattern: DEFAULT_PYTHON_PATTERN.to_string(),
            capture_order: SortOrder::Capture,
            strict_results: false,
            exception_separator: DEFAULT_EXCEPTION_SEPARATOR.to_string(),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            client_prefix: DEFAULT_CLIENT_PREFIX.to_string(),
            excluded_titles: default_excluded_titles(),
        }
    }
}

impl ReportConfig {
    /// Read a TOML config, or fall back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> ReportResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| ReportError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|detail| ReportError::Config {
            path: path.to_path_buf(),
            detail,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn matches_path(&self) -> PathBuf {
        if self.matches_file.is_absolute() {
            self.matches_file.clone()
        } else {
            self.data_directory.join(&self.matches_file)
        }
    }

    pub fn results_policy(&self) -> ResultsPolicy {
        ResultsPolicy::from_strict(self.strict_results)
    }

    pub fn error_filter(&self) -> ErrorFilter {
        ErrorFilter {
            session_prefix: self.session_prefix.clone(),
            excluded_titles: self.excluded_titles.clone(),
            separator: self.exception_separator.clone(),
        }
    }
}
