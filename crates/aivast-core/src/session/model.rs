//! Session summaries and details.

use super::timeline::TimelineEvent;
use crate::ids::SessionId;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SessionSummary {
    /// Parses `updated_at`.
    ///
    /// The backend emits naive ISO timestamps in UTC; RFC 3339 values with an
    /// explicit offset are accepted as well.
    pub fn updated_at_parsed(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.updated_at.as_deref()?)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Sorts summaries most recently updated first. Unparseable timestamps sort last.
pub fn sort_recent_first(sessions: &mut [SessionSummary]) {
    let floor = DateTime::<Utc>::MIN_UTC.fixed_offset();
    sessions.sort_by_key(|s| std::cmp::Reverse(s.updated_at_parsed().unwrap_or(floor)));
}

/// Response of `GET /sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// Response of `GET /sessions/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub session: Option<SessionSummary>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}
