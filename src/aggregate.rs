//! Capture aggregation: sums match counts per capture for one pattern and
//! orders the result for display.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matches::MatchRecord;

// ---------------------------------------------------------------------------
// Output ordering
// ---------------------------------------------------------------------------

/// Display order for aggregate entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Lexicographic by capture.
    #[default]
    Capture,
    /// Largest sum first, ties broken by capture.
    CountDescending,
}

/// One (capture, summed match count) pair, shaped like a chart row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCount {
    pub capture: String,
    #[serde(rename = "match")]
    pub count: u64,
}

// ---------------------------------------------------------------------------
// AggregateCount
// ---------------------------------------------------------------------------

/// Summed match counts per capture for a single pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateCount {
    pub pattern: String,
    counts: BTreeMap<String, u64>,
}

impl AggregateCount {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            counts: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, capture: &str, count: u64) {
        let slot = self.counts.entry(capture.to_string()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    pub fn get(&self, capture: &str) -> Option<u64> {
        self.counts.get(capture).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    pub fn entries(&self, order: SortOrder) -> Vec<CaptureCount> {
        let mut entries: Vec<CaptureCount> = self
            .counts
            .iter()
            .map(|(capture, count)| CaptureCount {
                capture: capture.clone(),
                count: *count,
            })
            .collect();

        if order == SortOrder::CountDescending {
            // Stable sort keeps the lexicographic order among equal counts.
            entries.sort_by(|a, b| b.count.cmp(&a.count));
        }
        entries
    }
}

/// Filter `records` to `pattern`, group by capture, and sum match counts.
pub fn aggregate_by_capture(records: &[MatchRecord], pattern: &str) -> AggregateCount {
    let mut agg = AggregateCount::new(pattern);
    for record in records.iter().filter(|r| r.pattern == pattern) {
        agg.add(record.capture(), record.match_count);
    }
    debug!(pattern, groups = agg.len(), total = agg.total(), "aggregated captures");
    agg
}
