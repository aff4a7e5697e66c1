//! Derived views over the exploded event table: exception names, the most
//! common errors, and the client/session join.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::events::EventRow;

pub const DEFAULT_EXCEPTION_SEPARATOR: &str = " - ";
pub const DEFAULT_SESSION_PREFIX: &str = "session:";
pub const DEFAULT_CLIENT_PREFIX: &str = "client:";

/// Titles of bookkeeping events that are never errors.
pub fn default_excluded_titles() -> Vec<String> {
    vec![
        "activeloopai/Hub: System information".to_string(),
        "Consent change".to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// Last piece of `title` split on `separator`, or the whole title.
///
/// Splitting runs left to right without overlap, so `"x - - y"` gives `"- y"`.
pub fn exception_of<'a>(title: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return title;
    }
    title.split(separator).last().unwrap_or(title)
}

/// Which rows count as error reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFilter {
    pub session_prefix: String,
    pub excluded_titles: Vec<String>,
    pub separator: String,
}

impl Default for ErrorFilter {
    fn default() -> Self {
        Self {
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            excluded_titles: default_excluded_titles(),
            separator: DEFAULT_EXCEPTION_SEPARATOR.to_string(),
        }
    }
}

impl ErrorFilter {
    pub fn matches(&self, row: &EventRow) -> bool {
        row.tag_starts_with(&self.session_prefix)
            && !self.excluded_titles.iter().any(|t| t == &row.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCount {
    pub exception: String,
    pub count: u64,
}

/// Count error rows by exception, most common first.
///
/// Equal counts keep the order in which each exception was first seen.
pub fn error_counts(rows: &[EventRow], filter: &ErrorFilter) -> Vec<ExceptionCount> {
    let mut counts: Vec<ExceptionCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows.iter().filter(|r| filter.matches(r)) {
        let exception = exception_of(&row.title, &filter.separator);
        match index.get(exception) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(exception, counts.len());
                counts.push(ExceptionCount {
                    exception: exception.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// The exception to highlight: the first entry of `error_counts`.
pub fn most_common_error(counts: &[ExceptionCount]) -> Option<&str> {
    counts.first().map(|c| c.exception.as_str())
}

// ---------------------------------------------------------------------------
// Client / session join
// ---------------------------------------------------------------------------

/// Rows whose tag starts with `prefix`, in table order.
pub fn partition_by_prefix<'a>(rows: &'a [EventRow], prefix: &str) -> Vec<&'a EventRow> {
    rows.iter().filter(|r| r.tag_starts_with(prefix)).collect()
}

/// One joined (client row, session row) pair sharing an `entry_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSession {
    pub entry_url: String,
    pub client_tag: String,
    pub session_tag: String,
    pub client_title: String,
}

/// Inner join of client rows to session rows on `entry_url`.
///
/// Many-to-many and not deduplicated: a client row pairs with every session
/// row of the same entry. Output follows client row order, then session row
/// order.
pub fn join_client_sessions(
    rows: &[EventRow],
    client_prefix: &str,
    session_prefix: &str,
) -> Vec<ClientSession> {
    let mut sessions_by_url: HashMap<&str, Vec<&EventRow>> = HashMap::new();
    for row in partition_by_prefix(rows, session_prefix) {
        sessions_by_url
            .entry(row.entry_url.as_str())
            .or_default()
            .push(row);
    }

    let mut joined = Vec::new();
    for client in partition_by_prefix(rows, client_prefix) {
        let Some(sessions) = sessions_by_url.get(client.entry_url.as_str()) else {
            continue;
        };
        for session in sessions {
            joined.push(ClientSession {
                entry_url: client.entry_url.clone(),
                client_tag: client.tag.clone().unwrap_or_default(),
                session_tag: session.tag.clone().unwrap_or_default(),
                client_title: client.title.clone(),
            });
        }
    }
    joined
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSessionCount {
    pub client: String,
    pub sessions: u64,
}

/// Joined pairs per client tag, largest first, ties by client tag.
pub fn sessions_per_client(pairs: &[ClientSession]) -> Vec<ClientSessionCount> {
    let mut per_client: BTreeMap<&str, u64> = BTreeMap::new();
    for pair in pairs {
        *per_client.entry(pair.client_tag.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<ClientSessionCount> = per_client
        .into_iter()
        .map(|(client, sessions)| ClientSessionCount {
            client: client.to_string(),
            sessions,
        })
        .collect();
    counts.sort_by(|a, b| b.sessions.cmp(&a.sessions));
    counts
}
