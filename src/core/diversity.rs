/// Diversity scoring: how far a blueprint strays from recent history.
///
/// Everything here is deterministic in its inputs.
use serde::{Deserialize, Serialize};

use crate::core::catalog::{CategoryKind, ElementCatalog};
use crate::schema::blueprint::Choice;
use crate::schema::record::SelectionRecord;
use crate::schema::report::{CategoryFrequency, CategoryRepeat, DiversityReport, HistoryAnalysis};

/// Most unused options suggested per category by [`DiversityScorer::analyze`].
const MAX_UNUSED_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Records a candidate is compared against.
    pub analysis_window: usize,
    /// Per-category repeat rate above which a recommendation is issued.
    pub warning_threshold: f64,
    /// Share of a category's uses above which one option counts as overused
    /// in a history analysis.
    pub overuse_share: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            analysis_window: 10,
            warning_threshold: 0.5,
            overuse_share: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiversityScorer {
    settings: ScoringSettings,
}

impl DiversityScorer {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Score a candidate's choices against a history window.
    ///
    /// For each category, the repeat rate is the fraction of window records
    /// that chose the same option. The score is one minus the mean repeat
    /// rate. An empty window scores 1.0.
    pub fn score<'a, I>(&self, candidate: &[Choice], window: I) -> DiversityReport
    where
        I: IntoIterator<Item = &'a SelectionRecord>,
    {
        let window: Vec<&SelectionRecord> = window.into_iter().collect();
        let window_len = window.len();

        let mut repeats = Vec::with_capacity(candidate.len());
        let mut recommendations = Vec::new();

        for choice in candidate {
            let count = window
                .iter()
                .filter(|r| r.chose(&choice.category, &choice.option))
                .count();
            let rate = if window_len == 0 {
                0.0
            } else {
                count as f64 / window_len as f64
            };
            if rate > self.settings.warning_threshold {
                recommendations.push(format!(
                    "category '{}' repeats '{}' in {}/{} recent generations; widen its soft-avoidance window or rotate through more of its options",
                    choice.category, choice.option, count, window_len
                ));
            }
            repeats.push(CategoryRepeat {
                category: choice.category.clone(),
                repeats: count,
                rate,
            });
        }

        let repeat_rate = if repeats.is_empty() {
            0.0
        } else {
            repeats.iter().map(|r| r.rate).sum::<f64>() / repeats.len() as f64
        };

        DiversityReport {
            score: (1.0 - repeat_rate).clamp(0.0, 1.0),
            window_len,
            repeats,
            recommendations,
        }
    }

    /// Retrospective analysis of a history window: option frequencies,
    /// normalized-entropy score, overuse warnings and unused-option hints.
    pub fn analyze<'a, I>(&self, catalog: &ElementCatalog, window: I) -> HistoryAnalysis
    where
        I: IntoIterator<Item = &'a SelectionRecord>,
    {
        let window: Vec<&SelectionRecord> = window.into_iter().collect();
        let mut frequencies = Vec::with_capacity(catalog.len());
        let mut recommendations = Vec::new();

        for category in catalog.categories() {
            let counts: Vec<(String, usize)> = category
                .options()
                .iter()
                .map(|opt| {
                    let n = window
                        .iter()
                        .filter(|r| r.chose(&category.name, &opt.id))
                        .count();
                    (opt.id.clone(), n)
                })
                .collect();
            let total: usize = counts.iter().map(|(_, n)| n).sum();

            if total > 0 {
                let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
                // first in catalog order wins ties
                if let Some((top, top_count)) = counts.iter().find(|(_, n)| *n == max) {
                    if *top_count as f64 / total as f64 > self.settings.overuse_share {
                        recommendations.push(format!(
                            "reduce use of '{}' in {} ({}/{} recent uses); try other options",
                            top, category.name, top_count, total
                        ));
                    }
                }

                if category.kind == CategoryKind::Core {
                    let unused: Vec<&str> = counts
                        .iter()
                        .filter(|(_, n)| *n == 0)
                        .map(|(id, _)| id.as_str())
                        .take(MAX_UNUSED_SUGGESTIONS)
                        .collect();
                    if !unused.is_empty() {
                        recommendations.push(format!(
                            "try unused {} options: {}",
                            category.name,
                            unused.join(", ")
                        ));
                    }
                }
            }

            frequencies.push(CategoryFrequency {
                category: category.name.clone(),
                normalized_entropy: normalized_entropy(&counts, total),
                counts,
            });
        }

        let score = if frequencies.is_empty() {
            1.0
        } else {
            frequencies.iter().map(|f| f.normalized_entropy).sum::<f64>() / frequencies.len() as f64
        };

        HistoryAnalysis {
            window_len: window.len(),
            score,
            frequencies,
            recommendations,
        }
    }
}

/// Shannon entropy of the usage counts divided by `ln(option_count)`.
///
/// Categories with no uses or a single option report 1.0: nothing in them
/// can be repeated more than necessary.
fn normalized_entropy(counts: &[(String, usize)], total: usize) -> f64 {
    if total == 0 || counts.len() < 2 {
        return 1.0;
    }
    let entropy: f64 = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(_, n)| {
            let p = *n as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    (entropy / (counts.len() as f64).ln()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CategorySpec, OptionSpec};
    use crate::schema::blueprint::ChoiceSource;
    use chrono::Utc;
    use std::collections::{BTreeMap, BTreeSet};

    fn record(sequence: u64, flavor: &str, tone: &str) -> SelectionRecord {
        SelectionRecord {
            sequence,
            timestamp: Utc::now(),
            selections: BTreeMap::from([
                ("flavor".to_string(), flavor.to_string()),
                ("tone".to_string(), tone.to_string()),
            ]),
            innovation_factors: BTreeSet::new(),
            diversity_score: 1.0,
        }
    }

    fn choice(category: &str, option: &str) -> Choice {
        Choice {
            category: category.to_string(),
            option: option.to_string(),
            source: ChoiceSource::Sampled,
            attributes: BTreeMap::new(),
        }
    }

    fn catalog() -> ElementCatalog {
        let spec = |name: &str, ids: &[&str]| CategorySpec {
            name: name.to_string(),
            kind: CategoryKind::Core,
            soft_window: None,
            options: ids
                .iter()
                .map(|id| OptionSpec {
                    id: id.to_string(),
                    weight: 1.0,
                    min_interval: 0,
                    attributes: BTreeMap::new(),
                })
                .collect(),
        };
        ElementCatalog::from_specs(vec![
            spec("flavor", &["steampunk", "wasteland", "urban", "xianxia"]),
            spec("tone", &["wry", "somber"]),
        ])
        .unwrap()
    }

    #[test]
    fn empty_window_scores_one() {
        let scorer = DiversityScorer::default();
        let report = scorer.score(&[choice("flavor", "urban")], std::iter::empty());
        assert_eq!(report.score, 1.0);
        assert_eq!(report.window_len, 0);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn dominant_flavor_lowers_score_and_warns() {
        let mut window: Vec<SelectionRecord> = (0..9).map(|i| record(i, "steampunk", "wry")).collect();
        window.push(record(9, "urban", "somber"));

        let scorer = DiversityScorer::default();
        let candidate = [choice("flavor", "steampunk"), choice("tone", "somber")];
        let report = scorer.score(&candidate, window.iter().rev());

        let flavor = report.repeats_for("flavor").unwrap();
        assert_eq!(flavor.repeats, 9);
        assert!((flavor.rate - 0.9).abs() < 1e-12);
        let tone = report.repeats_for("tone").unwrap();
        assert!((tone.rate - 0.1).abs() < 1e-12);
        assert!((report.score - 0.5).abs() < 1e-12);

        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("'flavor'"));
    }

    #[test]
    fn fully_repeated_window_scores_zero() {
        let window: Vec<SelectionRecord> = (0..4).map(|i| record(i, "urban", "wry")).collect();
        let scorer = DiversityScorer::default();
        let report = scorer.score(&[choice("flavor", "urban"), choice("tone", "wry")], &window);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.recommendations.len(), 2);
    }

    #[test]
    fn score_is_deterministic() {
        let window: Vec<SelectionRecord> = (0..6)
            .map(|i| record(i, if i % 2 == 0 { "urban" } else { "xianxia" }, "wry"))
            .collect();
        let scorer = DiversityScorer::default();
        let candidate = [choice("flavor", "urban"), choice("tone", "wry")];
        let a = scorer.score(&candidate, &window);
        let b = scorer.score(&candidate, &window);
        assert_eq!(a, b);
    }

    #[test]
    fn analyze_counts_and_entropy() {
        let window = vec![
            record(0, "steampunk", "wry"),
            record(1, "wasteland", "somber"),
            record(2, "urban", "wry"),
            record(3, "xianxia", "somber"),
        ];
        let analysis = DiversityScorer::default().analyze(&catalog(), &window);
        assert_eq!(analysis.window_len, 4);

        let flavor = analysis.frequency_of("flavor").unwrap();
        assert_eq!(flavor.total(), 4);
        assert!((flavor.normalized_entropy - 1.0).abs() < 1e-12);
        let tone = analysis.frequency_of("tone").unwrap();
        assert!((tone.normalized_entropy - 1.0).abs() < 1e-12);
        assert!((analysis.score - 1.0).abs() < 1e-12);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn analyze_flags_overuse_and_unused() {
        let window: Vec<SelectionRecord> = (0..5).map(|i| record(i, "urban", "wry")).collect();
        let analysis = DiversityScorer::default().analyze(&catalog(), &window);

        assert_eq!(analysis.frequency_of("flavor").unwrap().uses_of("urban"), 5);
        assert_eq!(analysis.frequency_of("flavor").unwrap().normalized_entropy, 0.0);
        assert_eq!(analysis.score, 0.0);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("'urban'") && r.contains("flavor")));
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r == "try unused flavor options: steampunk, wasteland, xianxia"));
    }

    #[test]
    fn analyze_empty_window() {
        let analysis = DiversityScorer::default().analyze(&catalog(), std::iter::empty());
        assert_eq!(analysis.window_len, 0);
        assert_eq!(analysis.score, 1.0);
        assert!(analysis.recommendations.is_empty());
    }
}
