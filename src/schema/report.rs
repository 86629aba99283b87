use serde::{Deserialize, Serialize};

/// How often the candidate's option for one category appeared in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRepeat {
    pub category: String,
    pub repeats: usize,
    /// `repeats / window_len`, or 0.0 for an empty window.
    pub rate: f64,
}

/// Outcome of scoring one blueprint against a history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    /// 1 − mean repeat rate, clamped to [0, 1].
    pub score: f64,
    pub window_len: usize,
    pub repeats: Vec<CategoryRepeat>,
    pub recommendations: Vec<String>,
}

impl DiversityReport {
    pub fn repeat_rate(&self) -> f64 {
        1.0 - self.score
    }

    pub fn repeats_for(&self, category: &str) -> Option<&CategoryRepeat> {
        self.repeats.iter().find(|r| r.category == category)
    }
}

/// Usage counts of every option of one category over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFrequency {
    pub category: String,
    /// (option id, uses), in catalog option order, zero counts included.
    pub counts: Vec<(String, usize)>,
    /// Shannon entropy normalized by `ln(option_count)`.
    pub normalized_entropy: f64,
}

impl CategoryFrequency {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn uses_of(&self, option: &str) -> usize {
        self.counts
            .iter()
            .find(|(id, _)| id == option)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Retrospective diversity analysis over a stretch of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryAnalysis {
    pub window_len: usize,
    /// Mean normalized entropy across categories, in [0, 1].
    pub score: f64,
    pub frequencies: Vec<CategoryFrequency>,
    pub recommendations: Vec<String>,
}

impl HistoryAnalysis {
    pub fn frequency_of(&self, category: &str) -> Option<&CategoryFrequency> {
        self.frequencies.iter().find(|f| f.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_repeat_rate() {
        let report = DiversityReport {
            score: 0.75,
            window_len: 4,
            repeats: vec![CategoryRepeat {
                category: "flavor".to_string(),
                repeats: 1,
                rate: 0.25,
            }],
            recommendations: Vec::new(),
        };
        assert!((report.repeat_rate() - 0.25).abs() < 1e-12);
        assert_eq!(report.repeats_for("flavor").unwrap().repeats, 1);
        assert!(report.repeats_for("tone").is_none());
    }

    #[test]
    fn frequency_totals() {
        let freq = CategoryFrequency {
            category: "tone".to_string(),
            counts: vec![("wry".to_string(), 3), ("somber".to_string(), 0)],
            normalized_entropy: 0.0,
        };
        assert_eq!(freq.total(), 3);
        assert_eq!(freq.uses_of("wry"), 3);
        assert_eq!(freq.uses_of("missing"), 0);
    }
}
