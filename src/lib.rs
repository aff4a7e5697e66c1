//! Usage analytics over tagged JSON event logs.
//!
//! The pipeline runs **Load → Normalize → Aggregate**, and each stage is a
//! plain function that can be called and tested on its own:
//!
//! - [`events`] loads `*.json` result files and explodes records into one row
//!   per tag.
//! - [`matches`] parses the newline-delimited match records and extracts the
//!   capture from each tag.
//! - [`aggregate`] sums match counts per capture for one pattern.
//! - [`views`] derives exception names, error rankings and the client/session
//!   join.
//! - [`report`] composes everything into a [`UsageReport`].

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod matches;
pub mod report;
pub mod views;

pub use aggregate::{aggregate_by_capture, AggregateCount, CaptureCount, SortOrder};
pub use config::ReportConfig;
pub use error::{ReportError, ReportResult};
pub use events::{explode, load_event_files, load_event_table, EventRecord, EventRow, ResultsPolicy};
pub use matches::{load_matches, parse_matches, MatchRecord};
pub use report::{Section, UsageReport};
