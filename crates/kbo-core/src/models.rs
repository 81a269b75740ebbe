use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Team id carried by placeholder teams whose name could not be resolved.
pub const UNKNOWN_TEAM_ID: &str = "unknown";

/// A canonical club. Built once from the static mapping and shared by
/// reference; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub short_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Team {
    pub fn new(id: &str, name: &str, short_name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            short_name: short_name.to_string(),
            logo: None,
        }
    }

    /// Placeholder for a name that matched no canonical team.
    pub fn unresolved(raw_name: &str) -> Self {
        Self {
            id: UNKNOWN_TEAM_ID.to_string(),
            name: raw_name.to_string(),
            short_name: raw_name.to_string(),
            logo: None,
        }
    }
}

/// Win/loss pair for a home or away split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitRecord {
    pub wins: u32,
    pub losses: u32,
}

/// One standings row for one team at capture time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: u32,
    pub team: Arc<Team>,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// As published by the site; not recomputed.
    pub win_rate: f64,
    /// `"-"` for the leader.
    pub game_behind: String,
    pub recent10: String,
    pub streak: String,
    pub home: SplitRecord,
    pub away: SplitRecord,
    pub last_updated: DateTime<Utc>,
}

/// State of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Canceled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "scheduled",
            GameStatus::Live => "live",
            GameStatus::Finished => "finished",
            GameStatus::Postponed => "postponed",
            GameStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fixture on the schedule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledGame {
    /// Content-derived; identical across crawls of the same fixture.
    pub id: String,
    pub date: NaiveDate,
    /// Site-local display time, e.g. `"18:30"`.
    pub time: String,
    pub home_team: Arc<Team>,
    pub away_team: Arc<Team>,
    pub stadium: String,
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_info: Option<String>,
}

/// Score line of a game in progress, parsed from the live score display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGameSnapshot {
    pub id: String,
    pub date: NaiveDate,
    pub home_team: Arc<Team>,
    pub away_team: Arc<Team>,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inning: Option<String>,
    pub status: GameStatus,
}

/// Uniform result envelope returned by every crawl operation.
///
/// Exactly one of `data` / `error` is present: the constructors are the
/// only way to build one.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: DateTime<Utc>,
    source: String,
}

impl<T> CrawlResult<T> {
    pub fn ok(data: T, source: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    pub fn failure(error: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Converts the envelope into a `Result`, carrying the error message on failure.
    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err("unknown error".to_string()),
        }
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
