use crate::models::ReportKind;
use crate::timeframe::Timeframe;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cache key for one report of one timeframe.
pub fn report_key(kind: ReportKind, timeframe: Timeframe) -> String {
    format!("{}:{}", kind.as_str(), timeframe)
}

/// In-memory blob store behind the repository. Values are opaque strings,
/// the repository decides what goes in them.
#[derive(Default)]
pub struct KlineStore {
    entries: RwLock<HashMap<String, String>>,
}

impl KlineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: String, value: String) {
        self.entries.write().await.insert(key, value);
    }

    /// Stores a whole run's worth of entries under one write lock so
    /// readers never observe a half-updated run.
    pub async fn set_many(&self, batch: Vec<(String, String)>) {
        let mut entries = self.entries.write().await;
        for (key, value) in batch {
            entries.insert(key, value);
        }
    }
}
