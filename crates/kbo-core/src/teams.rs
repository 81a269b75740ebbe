//! Free-text team name → canonical [`Team`] resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::Team;

/// Immutable name→team mapping, built once and shared by every crawl.
///
/// Lookup is exact first (mapping key, then canonical display name), then a
/// bidirectional substring scan in declaration order, which tolerates the
/// suffixes and stray text the site prints around names.
#[derive(Debug, Clone)]
pub struct TeamRegistry {
    entries: Vec<(String, Arc<Team>)>,
    exact: HashMap<String, usize>,
}

impl TeamRegistry {
    /// Build from `(key, team)` pairs; declaration order decides fuzzy ties.
    pub fn new(entries: Vec<(String, Team)>) -> Self {
        let entries: Vec<(String, Arc<Team>)> = entries
            .into_iter()
            .map(|(key, team)| (key, Arc::new(team)))
            .collect();

        let mut exact = HashMap::new();
        for (idx, (key, team)) in entries.iter().enumerate() {
            exact.entry(key.clone()).or_insert(idx);
            exact.entry(team.name.clone()).or_insert(idx);
        }

        Self { entries, exact }
    }

    /// The ten KBO league clubs keyed by the short names the site prints.
    pub fn kbo() -> Self {
        let table = [
            ("LG", "lg", "LG 트윈스"),
            ("KT", "kt", "KT 위즈"),
            ("두산", "doosan", "두산 베어스"),
            ("SSG", "ssg", "SSG 랜더스"),
            ("키움", "kiwoom", "키움 히어로즈"),
            ("NC", "nc", "NC 다이노스"),
            ("KIA", "kia", "KIA 타이거즈"),
            ("삼성", "samsung", "삼성 라이온즈"),
            ("롯데", "lotte", "롯데 자이언츠"),
            ("한화", "hanwha", "한화 이글스"),
        ];

        Self::new(
            table
                .into_iter()
                .map(|(key, id, name)| (key.to_string(), Team::new(id, name, key)))
                .collect(),
        )
    }

    /// Resolve a raw name to a canonical team, or `None` when nothing matches.
    pub fn resolve(&self, raw_name: &str) -> Option<Arc<Team>> {
        let name = raw_name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(&idx) = self.exact.get(name) {
            return Some(Arc::clone(&self.entries[idx].1));
        }

        self.entries
            .iter()
            .find(|(key, _)| name.contains(key.as_str()) || key.contains(name))
            .map(|(_, team)| Arc::clone(team))
    }

    /// Like [`resolve`](Self::resolve) but never fails: a miss yields an
    /// `"unknown"` placeholder carrying the raw text.
    pub fn resolve_or_placeholder(&self, raw_name: &str) -> Arc<Team> {
        self.resolve(raw_name).unwrap_or_else(|| {
            tracing::warn!(name = %raw_name, "Unknown team name");
            Arc::new(Team::unresolved(raw_name.trim()))
        })
    }

    pub fn teams(&self) -> impl Iterator<Item = &Arc<Team>> {
        self.entries.iter().map(|(_, team)| team)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TeamRegistry {
    fn default() -> Self {
        Self::kbo()
    }
}
