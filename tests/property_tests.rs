//! Property tests: history bounds, recency arithmetic, cooldown exclusion,
//! scoring and level-shaped sampling.

use blueprint_engine::core::catalog::{CategoryKind, CategorySpec, ElementCatalog, OptionSpec};
use blueprint_engine::core::constraint::{AvoidanceSettings, ConstraintEvaluator};
use blueprint_engine::core::diversity::DiversityScorer;
use blueprint_engine::core::history::HistoryLog;
use blueprint_engine::core::selector::{pick_index, selection_probabilities};
use blueprint_engine::schema::blueprint::{Choice, ChoiceSource};
use blueprint_engine::schema::record::SelectionRecord;
use chrono::Utc;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const OPTIONS: [&str; 4] = ["a", "b", "c", "d"];

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn record(sequence: u64, option: &str) -> SelectionRecord {
    SelectionRecord {
        sequence,
        timestamp: Utc::now(),
        selections: BTreeMap::from([("cat".to_string(), option.to_string())]),
        innovation_factors: BTreeSet::new(),
        diversity_score: 1.0,
    }
}

fn filled_log(capacity: usize, picks: &[usize]) -> HistoryLog {
    let mut log = HistoryLog::new(capacity);
    for (i, &pick) in picks.iter().enumerate() {
        log.append(record(i as u64, OPTIONS[pick])).unwrap();
    }
    log
}

/// Option indices into [`OPTIONS`], oldest first.
fn arb_picks(max: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..OPTIONS.len(), 0..max)
}

fn arb_intervals() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..6, OPTIONS.len())
}

fn arb_weights() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.05f64..20.0, 1..8)
}

fn category_with(intervals: &[i64]) -> ElementCatalog {
    ElementCatalog::from_specs(vec![CategorySpec {
        name: "cat".to_string(),
        kind: CategoryKind::Core,
        soft_window: None,
        options: OPTIONS
            .iter()
            .zip(intervals)
            .map(|(id, &min_interval)| OptionSpec {
                id: id.to_string(),
                weight: 1.0,
                min_interval,
                attributes: BTreeMap::new(),
            })
            .collect(),
    }])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// The log never exceeds capacity and keeps exactly the newest records.
    #[test]
    fn history_is_bounded(capacity in 1usize..20, picks in arb_picks(60)) {
        let log = filled_log(capacity, &picks);
        prop_assert_eq!(log.len(), picks.len().min(capacity));

        let kept: Vec<u64> = log.iter_chronological().map(|r| r.sequence).collect();
        let first = picks.len().saturating_sub(capacity) as u64;
        prop_assert_eq!(kept, (first..picks.len() as u64).collect::<Vec<u64>>());
        prop_assert!(log.verify().is_ok());
    }

    /// `last_used_at` counts generations back from the newest record.
    #[test]
    fn last_used_at_matches_scan(capacity in 1usize..30, picks in arb_picks(40)) {
        let log = filled_log(capacity, &picks);
        let retained = &picks[picks.len().saturating_sub(capacity)..];

        for (idx, option) in OPTIONS.iter().enumerate() {
            let expected = retained.iter().rev().position(|&p| p == idx);
            prop_assert_eq!(log.last_used_at("cat", option), expected);
            prop_assert_eq!(log.distances("cat").get(option).copied(), expected);
        }
    }

    /// Options on cooldown are never eligible unless every option is, and
    /// the eligible set is never empty.
    #[test]
    fn cooldown_exclusion_holds(intervals in arb_intervals(), picks in arb_picks(30)) {
        let catalog = category_with(&intervals);
        let category = &catalog.categories()[0];
        let log = filled_log(100, &picks);
        let state = ConstraintEvaluator::new(AvoidanceSettings::default()).evaluate(category, &log);

        prop_assert!(!state.eligible.is_empty());
        let cooling: Vec<&str> = category
            .options()
            .iter()
            .filter(|o| matches!(log.last_used_at("cat", &o.id), Some(d) if d < o.min_interval))
            .map(|o| o.id.as_str())
            .collect();

        if cooling.len() == OPTIONS.len() {
            prop_assert!(state.fallback);
            prop_assert_eq!(state.eligible.len(), 1);
        } else {
            prop_assert!(!state.fallback);
            for candidate in &state.eligible {
                prop_assert!(!cooling.contains(&candidate.option.id.as_str()));
            }
            prop_assert_eq!(state.excluded.len(), cooling.len());
        }
    }

    /// Scores stay in [0, 1] and depend only on their inputs.
    #[test]
    fn score_is_bounded_and_deterministic(picks in arb_picks(25), candidate in 0..OPTIONS.len()) {
        let log = filled_log(100, &picks);
        let choice = [Choice {
            category: "cat".to_string(),
            option: OPTIONS[candidate].to_string(),
            source: ChoiceSource::Sampled,
            attributes: BTreeMap::new(),
        }];
        let scorer = DiversityScorer::default();
        let a = scorer.score(&choice, log.window(10));
        let b = scorer.score(&choice, log.window(10));

        prop_assert!((0.0..=1.0).contains(&a.score));
        prop_assert_eq!(&a, &b);

        let window = picks.len().min(10);
        let repeats = picks.iter().rev().take(window).filter(|&&p| p == candidate).count();
        prop_assert_eq!(a.repeats[0].repeats, repeats);
    }

    /// Probabilities form a distribution, and lowering the level never
    /// spreads mass away from the heaviest option.
    #[test]
    fn lower_level_concentrates_mass(weights in arb_weights(), lo in 0.0f64..1.0, hi in 0.0f64..1.0) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let p_lo = selection_probabilities(&weights, lo);
        let p_hi = selection_probabilities(&weights, hi);

        prop_assert!((p_lo.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        prop_assert!((p_hi.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let max_lo = p_lo.iter().copied().fold(0.0, f64::max);
        let max_hi = p_hi.iter().copied().fold(0.0, f64::max);
        prop_assert!(max_lo + 1e-12 >= max_hi);
    }

    /// Mass on the options tied for the top weight never shrinks as the
    /// level falls, down to and past the argmax cutoff.
    #[test]
    fn tied_best_mass_never_shrinks(ties in 2usize..5, rest in arb_weights(), level in 0.0f64..1.0) {
        let mut weights: Vec<f64> = rest.iter().map(|w| w / 21.0).collect();
        weights.extend(std::iter::repeat(1.0).take(ties));
        let best_mass = |level: f64| -> Vec<f64> {
            selection_probabilities(&weights, level)
                .into_iter()
                .zip(&weights)
                .filter(|(_, w)| **w == 1.0)
                .map(|(p, _)| p)
                .collect()
        };

        let here = best_mass(level);
        let floor = best_mass(0.0);
        prop_assert!(floor.iter().all(|p| (p - 1.0 / ties as f64).abs() < 1e-12));
        prop_assert!(floor.iter().sum::<f64>() + 1e-12 >= here.iter().sum::<f64>());
        for p in &here {
            prop_assert!((p - here[0]).abs() < 1e-12);
        }
    }

    /// Every draw lands on a valid index with non-zero probability.
    #[test]
    fn pick_index_in_range(weights in arb_weights(), level in 0.0f64..=1.0, draw in 0.0f64..=1.0) {
        let i = pick_index(&weights, level, draw);
        prop_assert!(i < weights.len());
        prop_assert!(selection_probabilities(&weights, level)[i] > 0.0);
    }
}
