use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Immutable snapshot of one completed generation, owned by the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Category name → chosen option id.
    pub selections: BTreeMap<String, String>,
    pub innovation_factors: BTreeSet<String>,
    pub diversity_score: f64,
}

impl SelectionRecord {
    /// The option this record chose for `category`.
    pub fn option_for(&self, category: &str) -> Option<&str> {
        self.selections.get(category).map(String::as_str)
    }

    /// Returns true if this record chose `option` in `category`.
    pub fn chose(&self, category: &str, option: &str) -> bool {
        self.option_for(category) == Some(option)
    }
}
