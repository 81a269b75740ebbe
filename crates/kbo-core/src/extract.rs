//! Site-specific row parsers.
//!
//! Every extractor takes already-fetched [`TableRow`]s and is tolerant of
//! bad input: a row that does not have the expected shape is logged and
//! skipped, never fatal to the rest of the table.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::models::{
    GameStatus, LiveGameSnapshot, ScheduledGame, SplitRecord, Standing, compute_hash,
};
use crate::table::TableRow;
use crate::teams::TeamRegistry;

pub const STANDINGS_MIN_CELLS: usize = 10;
pub const SCHEDULE_MIN_CELLS: usize = 6;

/// Row classes the site uses for games in progress.
const LIVE_MARKERS: [&str; 2] = ["live", "playing"];

static VERSUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+vs\s+").expect("versus pattern is valid"));

/// `<team> <score> : <score> <team> [inning]`
static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s+(\d+)\s*:\s*(\d+)\s+(\w+)\s*(.+)?").expect("score pattern is valid")
});

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

/// Parse the standings table.
///
/// Columns: rank, team, games, wins, losses, draws, win rate, games behind,
/// last ten, streak, and optionally home and away splits.
pub fn standings(
    rows: &[TableRow],
    teams: &TeamRegistry,
    captured_at: DateTime<Utc>,
) -> Vec<Standing> {
    let mut standings = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.cells.len() < STANDINGS_MIN_CELLS {
            tracing::warn!(
                row = index,
                cells = row.cells.len(),
                "Skipping standings row with too few cells"
            );
            continue;
        }

        let rank = leading_number(row.cell(0))
            .filter(|r| *r > 0)
            .unwrap_or(index as u32 + 1);
        let game_behind = match row.cell(7) {
            "" => "-".to_string(),
            gb => gb.to_string(),
        };

        standings.push(Standing {
            rank,
            team: teams.resolve_or_placeholder(row.cell(1)),
            games: leading_number(row.cell(2)).unwrap_or(0),
            wins: leading_number(row.cell(3)).unwrap_or(0),
            losses: leading_number(row.cell(4)).unwrap_or(0),
            draws: leading_number(row.cell(5)).unwrap_or(0),
            win_rate: parse_rate(row.cell(6)),
            game_behind,
            recent10: row.cell(8).to_string(),
            streak: row.cell(9).to_string(),
            home: parse_split(row.cell(10)),
            away: parse_split(row.cell(11)),
            last_updated: captured_at,
        });
    }

    tracing::info!(count = standings.len(), "Parsed standings");
    standings
}

/// Leading decimal digits of `text`, like a lenient `parseInt`.
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_rate(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite())
        .unwrap_or(0.0)
}

/// `"W-D-L"` or `"W-L"`: first number is wins, last is losses.
fn parse_split(text: &str) -> SplitRecord {
    let parts: Option<Vec<u32>> = text
        .split('-')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect();

    match parts.as_deref() {
        Some([wins, .., losses]) => SplitRecord {
            wins: *wins,
            losses: *losses,
        },
        _ => SplitRecord::default(),
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Parse the daily schedule table.
///
/// Columns: time, matchup (`"<home> vs <away>"`, either side may carry a
/// score), stadium, broadcast, then free-form remarks.
pub fn schedule(rows: &[TableRow], teams: &TeamRegistry, date: NaiveDate) -> Vec<ScheduledGame> {
    let mut games = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.cells.len() < SCHEDULE_MIN_CELLS {
            tracing::warn!(
                row = index,
                cells = row.cells.len(),
                "Skipping schedule row with too few cells"
            );
            continue;
        }

        let matchup = row.cell(1);
        let sides: Vec<&str> = VERSUS.split(matchup).map(str::trim).collect();
        let [home_side, away_side] = sides.as_slice() else {
            tracing::warn!(row = index, matchup = %matchup, "Skipping schedule row without a matchup");
            continue;
        };
        if home_side.is_empty() || away_side.is_empty() {
            tracing::warn!(row = index, matchup = %matchup, "Skipping schedule row without a matchup");
            continue;
        }

        let (home_name, home_score) = split_trailing_score(home_side);
        let (away_name, away_score) = split_leading_score(away_side);
        let time = row.cell(0).to_string();
        let stadium = row.cell(2).to_string();
        let broadcast = row.cell(3);

        games.push(ScheduledGame {
            id: game_id(date, &time, home_name, away_name, &stadium),
            date,
            time,
            home_team: teams.resolve_or_placeholder(home_name),
            away_team: teams.resolve_or_placeholder(away_name),
            stadium,
            status: game_status(row, home_score.zip(away_score).is_some()),
            home_score,
            away_score,
            inning: None,
            broadcast_info: (!broadcast.is_empty()).then(|| broadcast.to_string()),
        });
    }

    tracing::info!(%date, count = games.len(), "Parsed schedule");
    games
}

/// `"LG 3"` → `("LG", Some(3))`; a bare name has no score.
fn split_trailing_score(side: &str) -> (&str, Option<u32>) {
    match side.rsplit_once(char::is_whitespace) {
        Some((name, score)) if !name.trim().is_empty() => match score.parse() {
            Ok(score) => (name.trim(), Some(score)),
            Err(_) => (side, None),
        },
        _ => (side, None),
    }
}

/// `"5 KIA"` → `("KIA", Some(5))`.
fn split_leading_score(side: &str) -> (&str, Option<u32>) {
    match side.split_once(char::is_whitespace) {
        Some((score, name)) if !name.trim().is_empty() => match score.parse() {
            Ok(score) => (name.trim(), Some(score)),
            Err(_) => (side, None),
        },
        _ => (side, None),
    }
}

fn is_live(row: &TableRow) -> bool {
    LIVE_MARKERS.iter().any(|marker| row.has_class(marker))
}

fn game_status(row: &TableRow, has_score: bool) -> GameStatus {
    if is_live(row) {
        return GameStatus::Live;
    }

    let remarks = row.cells.iter().skip(4);
    for remark in remarks {
        if remark.contains("취소") {
            return GameStatus::Canceled;
        }
        if remark.contains("연기") {
            return GameStatus::Postponed;
        }
    }

    if has_score {
        GameStatus::Finished
    } else {
        GameStatus::Scheduled
    }
}

/// Stable across crawls: derived from the fixture, not the crawl.
fn game_id(date: NaiveDate, time: &str, home: &str, away: &str, stadium: &str) -> String {
    let hash = compute_hash(&format!("{date}|{time}|{home}|{away}|{stadium}"));
    format!("game_{}_{}", date.format("%Y%m%d"), &hash[..12])
}

// ---------------------------------------------------------------------------
// Live games
// ---------------------------------------------------------------------------

/// Parse score lines of rows flagged as in progress.
pub fn live_games(
    rows: &[TableRow],
    teams: &TeamRegistry,
    date: NaiveDate,
) -> Vec<LiveGameSnapshot> {
    let mut games = Vec::new();

    for (index, row) in rows.iter().enumerate().filter(|(_, row)| is_live(row)) {
        let text = row.cell(1);
        let Some(caps) = SCORE_LINE.captures(text) else {
            tracing::warn!(row = index, text = %text, "Skipping live row without a score line");
            continue;
        };

        let (Ok(home_score), Ok(away_score)) = (caps[2].parse::<u32>(), caps[3].parse::<u32>())
        else {
            tracing::warn!(row = index, text = %text, "Skipping live row with unreadable score");
            continue;
        };

        let home = &caps[1];
        let away = &caps[4];
        let inning = caps
            .get(5)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let hash = compute_hash(&format!("{date}|{home}|{away}"));

        games.push(LiveGameSnapshot {
            id: format!("live_{}_{}", date.format("%Y%m%d"), &hash[..12]),
            date,
            home_team: teams.resolve_or_placeholder(home),
            away_team: teams.resolve_or_placeholder(away),
            home_score,
            away_score,
            inning,
            status: GameStatus::Live,
        });
    }

    tracing::info!(count = games.len(), "Parsed live games");
    games
}
