//! Query History - In-memory list of the queries run in this session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Natural,
    Spl,
}

/// History entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Entry ID
    pub id: String,

    pub kind: QueryKind,

    /// Question or raw SPL as typed by the user
    pub input: String,

    /// SPL that was actually run
    pub spl_query: String,

    pub success: bool,
    pub result_count: usize,

    /// Seconds
    pub processing_time: f64,

    pub timestamp: DateTime<Utc>,
}

/// Bounded session history, oldest entries evicted first
pub struct QueryHistory {
    entries: RwLock<VecDeque<HistoryEntry>>,
    max_entries: usize,
}

impl QueryHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a run and return the entry id
    pub async fn record(
        &self,
        kind: QueryKind,
        input: impl Into<String>,
        spl_query: impl Into<String>,
        success: bool,
        result_count: usize,
        processing_time: f64,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();

        let entry = HistoryEntry {
            id: id.clone(),
            kind,
            input: input.into(),
            spl_query: spl_query.into(),
            success,
            result_count,
            processing_time,
            timestamp: Utc::now(),
        };

        let mut entries = self.entries.write().await;
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }

        id
    }

    /// All entries, oldest first
    pub async fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// The last `count` entries, newest first
    pub async fn recent(&self, count: usize) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().rev().take(count).cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_recent() {
        let history = QueryHistory::default();
        history.record(QueryKind::Natural, "show errors", "search error", true, 3, 0.4).await;
        let id = history.record(QueryKind::Spl, "search index=main", "search index=main", false, 0, 0.1).await;

        assert_eq!(history.len().await, 2);
        let recent = history.recent(1).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].kind, QueryKind::Spl);
        assert!(!recent[0].success);
    }

    #[tokio::test]
    async fn test_evicts_oldest() {
        let history = QueryHistory::new(2);
        for i in 0..3 {
            history.record(QueryKind::Spl, format!("q{}", i), format!("search q{}", i), true, i, 0.0).await;
        }

        let inputs: Vec<String> = history.entries().await.into_iter().map(|e| e.input).collect();
        assert_eq!(inputs, vec!["q1", "q2"]);

        history.clear().await;
        assert!(history.is_empty().await);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&QueryKind::Natural).unwrap(), "\"natural\"");
    }
}
