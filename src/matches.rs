//! Pattern match records and capture extraction.
//!
//! The matches file is newline-delimited JSON, one record per line. Each record
//! says how many times `pattern` matched `tag`, and where inside `tag` the
//! interesting part (the capture) lives.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};

/// One line of the matches file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub pattern: String,
    pub tag: String,
    pub capture_start: usize,
    /// End offset, exclusive. Any negative value means "to end of tag".
    pub capture_end: i64,
    #[serde(rename = "match")]
    pub match_count: u64,
}

impl MatchRecord {
    /// The substring of `tag` selected by the capture offsets.
    ///
    /// Offsets count characters. Out-of-range offsets clamp to the tag, so a
    /// start past the end or an end before the start gives `""`.
    pub fn capture(&self) -> &str {
        let start = char_to_byte(&self.tag, self.capture_start);
        let end = if self.capture_end < 0 {
            self.tag.len()
        } else {
            let end = usize::try_from(self.capture_end).unwrap_or(usize::MAX);
            char_to_byte(&self.tag, end)
        };

        if end <= start {
            ""
        } else {
            &self.tag[start..end]
        }
    }
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a single line. `line_no` is 1-based and only used for errors.
pub fn parse_match_line(
    source_name: &str,
    line: &str,
    line_no: usize,
) -> ReportResult<MatchRecord> {
    serde_json::from_str(line)
        .map_err(|e| ReportError::data_format_at(source_name, line_no, e.to_string()))
}

/// Parse every non-blank line of `reader`. Blank lines are skipped but still
/// advance the line counter.
pub fn parse_matches<R: BufRead>(source_name: &str, reader: R) -> ReportResult<Vec<MatchRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line
            .map_err(|e| ReportError::data_format_at(source_name, line_no, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_match_line(source_name, &line, line_no)?);
    }
    Ok(records)
}

/// Open and parse a matches file. A missing file is a `MissingInput` error.
pub fn load_matches(path: &Path) -> ReportResult<Vec<MatchRecord>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReportError::missing_input(path),
        _ => ReportError::io(path, e),
    })?;

    let source_name = path.display().to_string();
    let records = parse_matches(&source_name, BufReader::new(file))?;
    debug!(file = %source_name, "matches file parsed");
    info!(records = records.len(), "match records loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rec(tag: &str, start: usize, end: i64) -> MatchRecord {
        MatchRecord {
            pattern: "p".to_string(),
            tag: tag.to_string(),
            capture_start: start,
            capture_end: end,
            match_count: 1,
        }
    }

    #[rstest]
    #[case("os:linux", 3, -1, "linux")]
    #[case("os:linux", 3, 6, "lin")]
    #[case("os:linux", 0, 2, "os")]
    #[case("os:linux", 8, -1, "")]
    #[case("os:linux", 20, -1, "")]
    #[case("os:linux", 3, 100, "linux")]
    #[case("os:linux", 5, 3, "")]
    #[case("os:linux", 3, 3, "")]
    #[case("python:3.8.10", 7, 8, "3")]
    #[case("python:3.8.10", 7, -1, "3.8.10")]
    #[case("os:linux", 3, -2, "linux")]
    fn test_capture(
        #[case] tag: &str,
        #[case] start: usize,
        #[case] end: i64,
        #[case] expected: &str,
    ) {
        assert_eq!(rec(tag, start, end).capture(), expected);
    }

    #[test]
    fn test_capture_counts_characters_not_bytes() {
        assert_eq!(rec("lang:日本語", 5, 7).capture(), "日本");
        assert_eq!(rec("lang:日本語", 6, -1).capture(), "本語");
    }

    #[test]
    fn test_parse_line_renames_match_field() {
        let line = r#"{"pattern":"os:#","tag":"os:linux","capture_start":3,"capture_end":-1,"match":5}"#;
        let r = parse_match_line("m.jsonl", line, 1).unwrap();
        assert_eq!(r.pattern, "os:#");
        assert_eq!(r.match_count, 5);
        assert_eq!(r.capture_end, -1);
    }

    #[test]
    fn test_parse_line_missing_pattern_reports_line() {
        let line = r#"{"tag":"os:linux","capture_start":3,"capture_end":-1,"match":5}"#;
        let err = parse_match_line("m.jsonl", line, 7).unwrap_err();
        assert!(err.is_data_format());
        assert_eq!(err.line(), Some(7));
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn test_parse_line_negative_start_rejected() {
        let line = r#"{"pattern":"p","tag":"t","capture_start":-1,"capture_end":-1,"match":1}"#;
        let err = parse_match_line("m.jsonl", line, 2).unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_parse_matches_skips_blank_lines_but_counts_them() {
        let input = concat!(
            r#"{"pattern":"p","tag":"t","capture_start":0,"capture_end":-1,"match":1}"#,
            "\n\n   \n",
            r#"{"pattern":"p","tag":"t"}"#,
            "\n"
        );
        let err = parse_matches("m.jsonl", input.as_bytes()).unwrap_err();
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_parse_matches_all_valid() {
        let input = concat!(
            r#"{"pattern":"os:#","tag":"os:linux","capture_start":3,"capture_end":-1,"match":5}"#,
            "\n",
            r#"{"pattern":"os:#","tag":"os:darwin","capture_start":3,"capture_end":-1,"match":2}"#,
        );
        let records = parse_matches("m.jsonl", input.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].capture(), "darwin");
    }

    #[test]
    fn test_parse_matches_not_json() {
        let err = parse_matches("m.jsonl", "oops\n".as_bytes()).unwrap_err();
        assert!(err.is_data_format());
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_load_matches_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_matches(&dir.path().join("matches.jsonl")).unwrap_err();
        assert!(err.is_missing_input());
    }
}
