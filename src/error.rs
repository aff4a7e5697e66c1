use std::path::PathBuf;
use thiserror::Error;

pub type ReportResult<T> = Result<T, ReportError>;

/// Errors raised while loading or aggregating report inputs.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A required input file or directory does not exist.
    #[error("missing input: {}", .path.display())]
    MissingInput { path: PathBuf },

    /// Input exists but is not shaped the way the loader expects.
    /// `line` is 1-based and only set for line-oriented inputs.
    #[error("data format error in {source_name}{}: {detail}", line_suffix(.line))]
    DataFormat {
        source_name: String,
        line: Option<usize>,
        detail: String,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {detail}", .path.display())]
    Config { path: PathBuf, detail: String },
}

impl ReportError {
    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    pub fn data_format(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DataFormat {
            source_name: source_name.into(),
            line: None,
            detail: detail.into(),
        }
    }

    pub fn data_format_at(
        source_name: impl Into<String>,
        line: usize,
        detail: impl Into<String>,
    ) -> Self {
        Self::DataFormat {
            source_name: source_name.into(),
            line: Some(line),
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Line number of a line-addressable format error.
    pub fn line(&self) -> Option<usize> {
        match self {
            ReportError::DataFormat { line, .. } => *line,
            _ => None,
        }
    }

    pub fn is_data_format(&self) -> bool {
        matches!(self, ReportError::DataFormat { .. })
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, ReportError::MissingInput { .. })
    }
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|n| format!(" at line {n}")).unwrap_or_default()
}
