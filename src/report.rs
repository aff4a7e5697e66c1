//! # Usage report
//!
//! Composes the pipeline stages into one document:
//!
//! 1. **Load** the event directory and the matches file.
//! 2. **Normalize** events into one row per tag.
//! 3. **Aggregate** captures per pattern and derive the error and
//!    client/session views.
//!
//! Each section of the report is computed independently. When an input fails
//! to load, only the sections built from that input are marked failed; they
//! carry the error text and are never rendered as empty.

use std::fmt::Write as _;

use colored::*;
use serde::Serialize;
use tracing::{error, info};

use crate::aggregate::{aggregate_by_capture, CaptureCount, SortOrder};
use crate::config::ReportConfig;
use crate::error::ReportResult;
use crate::events::{load_event_table, EventRow};
use crate::matches::{load_matches, MatchRecord};
use crate::views::{
    error_counts, join_client_sessions, most_common_error, sessions_per_client,
    ClientSessionCount, ExceptionCount,
};

// ---------------------------------------------------------------------------
// Section outcome
// ---------------------------------------------------------------------------

/// Outcome of one report section.
///
/// Serialized with a `status` field next to the payload fields, or next to
/// `error` when the section failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Failed { error: String },
}

impl<T> Section<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Section::Failed { .. })
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(v) => Some(v),
            Section::Failed { .. } => None,
        }
    }

    fn from_input<I>(name: &str, input: &Result<I, String>, build: impl FnOnce(&I) -> T) -> Self {
        match input {
            Ok(data) => Section::Ready(build(data)),
            Err(message) => {
                error!(section = name, error = %message, "report section failed");
                Section::Failed {
                    error: message.clone(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Section payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSection {
    pub pattern: String,
    pub total: u64,
    pub entries: Vec<CaptureCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorSection {
    /// Most common exception, highlighted when rendered.
    pub highlighted: Option<String>,
    pub counts: Vec<ExceptionCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSessionSection {
    /// Number of joined (client, session) pairs.
    pub pairs: usize,
    pub clients: Vec<ClientSessionCount>,
}

// ---------------------------------------------------------------------------
// UsageReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub project: String,
    pub operating_systems: Section<CaptureSection>,
    pub python_versions: Section<CaptureSection>,
    pub errors: Section<ErrorSection>,
    pub client_sessions: Section<ClientSessionSection>,
}

impl UsageReport {
    /// Load both inputs named by `config` and build every section.
    pub fn build(config: &ReportConfig) -> Self {
        let events = load_event_table(&config.data_directory, config.results_policy());
        let matches = load_matches(&config.matches_path());
        Self::from_inputs(config, events, matches)
    }

    /// Build from already loaded inputs.
    pub fn from_inputs(
        config: &ReportConfig,
        events: ReportResult<Vec<EventRow>>,
        matches: ReportResult<Vec<MatchRecord>>,
    ) -> Self {
        let events = events.map_err(|e| e.to_string());
        let matches = matches.map_err(|e| e.to_string());

        let order = config.capture_order;

        let report = UsageReport {
            project: config.project_name.clone(),
            operating_systems: Section::from_input(
                "operating_systems",
                &matches,
                |records| capture_section(records, &config.os_pattern, order),
            ),
            python_versions: Section::from_input(
                "python_versions",
                &matches,
                |records| capture_section(records, &config.python_pattern, order),
            ),
            errors: Section::from_input("errors", &events, |rows| {
                let counts = error_counts(rows, &config.error_filter());
                ErrorSection {
                    highlighted: most_common_error(&counts).map(str::to_string),
                    counts,
                }
            }),
            client_sessions: Section::from_input("client_sessions", &events, |rows| {
                let pairs =
                    join_client_sessions(rows, &config.client_prefix, &config.session_prefix);
                ClientSessionSection {
                    pairs: pairs.len(),
                    clients: sessions_per_client(&pairs),
                }
            }),
        };

        info!(failed = report.failed_sections().len(), "usage report built");
        report
    }

    pub fn failed_sections(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if self.operating_systems.is_failed() {
            failed.push("operating_systems");
        }
        if self.python_versions.is_failed() {
            failed.push("python_versions");
        }
        if self.errors.is_failed() {
            failed.push("errors");
        }
        if self.client_sessions.is_failed() {
            failed.push("client_sessions");
        }
        failed
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_sections().is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain terminal rendering.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", format!("# {}: Usage report", self.project).bold());

        render_section(&mut out, "Operating systems", &self.operating_systems, render_captures);
        render_section(&mut out, "Python versions", &self.python_versions, render_captures);
        render_section(&mut out, "Most common errors", &self.errors, render_errors);
        render_section(&mut out, "Sessions per client", &self.client_sessions, render_clients);
        out
    }
}

fn capture_section(records: &[MatchRecord], pattern: &str, order: SortOrder) -> CaptureSection {
    let agg = aggregate_by_capture(records, pattern);
    CaptureSection {
        pattern: pattern.to_string(),
        total: agg.total(),
        entries: agg.entries(order),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn render_section<T>(
    out: &mut String,
    heading: &str,
    section: &Section<T>,
    body: fn(&mut String, &T),
) {
    let _ = writeln!(out, "\n{}", format!("## {heading}").bold());
    match section {
        Section::Ready(data) => body(out, data),
        Section::Failed { error } => {
            let _ = writeln!(out, "  {} {}", "failed:".red().bold(), error);
        }
    }
}

fn render_captures(out: &mut String, section: &CaptureSection) {
    if section.entries.is_empty() {
        let _ = writeln!(out, "  (no matches for {})", section.pattern);
        return;
    }
    let width = section.entries.iter().map(|e| e.capture.chars().count()).max().unwrap_or(0);
    for entry in &section.entries {
        let _ = writeln!(out, "  {:<width$}  {}", entry.capture, entry.count);
    }
}

fn render_errors(out: &mut String, section: &ErrorSection) {
    if section.counts.is_empty() {
        let _ = writeln!(out, "  (no errors reported)");
        return;
    }
    let width = section.counts.iter().map(|c| c.exception.chars().count()).max().unwrap_or(0);
    for count in &section.counts {
        let label = format!("{:<width$}", count.exception);
        if section.highlighted.as_deref() == Some(count.exception.as_str()) {
            let _ = writeln!(out, "  {}  {}", label.yellow().bold(), count.count);
        } else {
            let _ = writeln!(out, "  {}  {}", label, count.count);
        }
    }
}

fn render_clients(out: &mut String, section: &ClientSessionSection) {
    if section.clients.is_empty() {
        let _ = writeln!(out, "  (no client sessions)");
        return;
    }
    let width = section.clients.iter().map(|c| c.client.chars().count()).max().unwrap_or(0);
    for client in &section.clients {
        let _ = writeln!(out, "  {:<width$}  {}", client.client, client.sessions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::events::{explode, EventRecord};
    use serde_json::Map;

    fn events() -> Vec<EventRow> {
        let record = |title: &str, tags: &[&str], url: &str| EventRecord {
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            entry_url: url.to_string(),
            extra: Map::new(),
        };
        explode(vec![
            record("cli - ValueError", &["session:1", "client:a"], "u1"),
            record("cli - ValueError", &["session:2", "client:b"], "u2"),
            record("cli - KeyError", &["session:3"], "u3"),
        ])
    }

    fn matches() -> Vec<MatchRecord> {
        let rec = |pattern: &str, tag: &str, start, end, n| MatchRecord {
            pattern: pattern.to_string(),
            tag: tag.to_string(),
            capture_start: start,
            capture_end: end,
            match_count: n,
        };
        vec![
            rec("os:#", "os:linux", 3, -1, 5),
            rec("os:#", "os:linux", 3, -1, 2),
            rec("python:#<1>.*", "python:3.9.7", 7, 8, 4),
        ]
    }

    #[test]
    fn test_all_sections_ready() {
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(events()), Ok(matches()));
        assert!(!report.has_failures());

        let os = report.operating_systems.ready().unwrap();
        assert_eq!(os.total, 7);
        assert_eq!(os.entries[0].capture, "linux");

        let py = report.python_versions.ready().unwrap();
        assert_eq!(py.entries[0].capture, "3");

        let errors = report.errors.ready().unwrap();
        assert_eq!(errors.highlighted.as_deref(), Some("ValueError"));

        let clients = report.client_sessions.ready().unwrap();
        assert_eq!(clients.pairs, 2);
    }

    #[test]
    fn test_match_failure_only_fails_match_sections() {
        let err = ReportError::data_format_at("matches.jsonl", 2, "missing field `pattern`");
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(events()), Err(err));
        assert_eq!(
            report.failed_sections(),
            vec!["operating_systems", "python_versions"]
        );
        match &report.operating_systems {
            Section::Failed { error } => assert!(error.contains("line 2")),
            Section::Ready(_) => panic!("expected failure"),
        }
        assert!(report.errors.ready().is_some());
    }

    #[test]
    fn test_event_failure_only_fails_event_sections() {
        let err = ReportError::data_format("a.json", "expected a JSON object at top level");
        let report = UsageReport::from_inputs(&ReportConfig::default(), Err(err), Ok(matches()));
        assert_eq!(report.failed_sections(), vec!["errors", "client_sessions"]);
    }

    #[test]
    fn test_failed_section_is_not_rendered_empty() {
        let err = ReportError::missing_input("/data/matches.jsonl");
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(events()), Err(err));
        let text = report.render_text();
        assert!(text.contains("failed:"));
        assert!(text.contains("/data/matches.jsonl"));
        assert!(!text.contains("(no matches"));
    }

    #[test]
    fn test_json_marks_section_status() {
        let err = ReportError::missing_input("/data/matches.jsonl");
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(events()), Err(err));
        let v: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(v["operating_systems"]["status"], "failed");
        assert_eq!(v["errors"]["status"], "ready");
        assert!(v["operating_systems"]["error"]
            .as_str()
            .unwrap()
            .contains("matches.jsonl"));
        assert_eq!(v["errors"]["counts"][0]["exception"], "ValueError");
        assert_eq!(v["project"], "awesome_python_project");
    }

    #[test]
    fn test_render_text_lists_captures() {
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(events()), Ok(matches()));
        let text = report.render_text();
        assert!(text.contains("Operating systems"));
        assert!(text.contains("linux"));
        assert!(text.contains("KeyError"));
        assert!(text.contains("client:a"));
    }

    #[test]
    fn test_render_captures_pads_by_characters() {
        let section = CaptureSection {
            pattern: "lang:#".to_string(),
            total: 10,
            entries: vec![
                CaptureCount {
                    capture: "linux".to_string(),
                    count: 7,
                },
                CaptureCount {
                    capture: "日本".to_string(),
                    count: 3,
                },
            ],
        };
        let mut out = String::new();
        render_captures(&mut out, &section);
        assert_eq!(out, "  linux  7\n  日本     3\n");
    }

    #[test]
    fn test_empty_inputs_render_placeholders() {
        let report = UsageReport::from_inputs(&ReportConfig::default(), Ok(vec![]), Ok(vec![]));
        assert!(!report.has_failures());
        let text = report.render_text();
        assert!(text.contains("(no matches for os:#)"));
        assert!(text.contains("(no errors reported)"));
    }
}
