/// Constraint evaluation: hard cooldowns and soft recency penalties.
///
/// Hard exclusion is decided first; the soft penalty only reweights options
/// that survived it.
use serde::{Deserialize, Serialize};

use crate::core::catalog::{CatalogOption, Category};
use crate::core::history::HistoryLog;

/// Soft-avoidance tuning shared by every category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceSettings {
    /// Generations during which a reused option is down-weighted.
    pub soft_window: usize,
    /// Weight multiplier applied to an option used in the previous
    /// generation. Older uses within the window get a milder penalty.
    pub soft_penalty: f64,
}

impl Default for AvoidanceSettings {
    fn default() -> Self {
        Self {
            soft_window: 2,
            soft_penalty: 0.35,
        }
    }
}

/// An option that may be drawn, with its constraint-adjusted weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub option: &'a CatalogOption,
    pub weight: f64,
    pub last_used: Option<usize>,
}

/// Per-category constraint outcome against one history snapshot.
///
/// Derived on every selection and never cached: the next append
/// invalidates it.
#[derive(Debug, Clone)]
pub struct ConstraintState<'a> {
    pub category: &'a Category,
    /// Ids of options still on cooldown.
    pub excluded: Vec<&'a str>,
    /// Never empty.
    pub eligible: Vec<Candidate<'a>>,
    /// True when every option was on cooldown and the least-recently-used
    /// one was admitted instead.
    pub fallback: bool,
}

impl ConstraintState<'_> {
    pub fn is_excluded(&self, option: &str) -> bool {
        self.excluded.iter().any(|id| *id == option)
    }

    pub fn weight_of(&self, option: &str) -> Option<f64> {
        self.eligible
            .iter()
            .find(|c| c.option.id == option)
            .map(|c| c.weight)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintEvaluator {
    settings: AvoidanceSettings,
}

impl ConstraintEvaluator {
    pub fn new(settings: AvoidanceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AvoidanceSettings {
        &self.settings
    }

    /// Soft-avoidance window in effect for `category`.
    pub fn soft_window_for(&self, category: &Category) -> usize {
        category.soft_window.unwrap_or(self.settings.soft_window)
    }

    /// Penalty multiplier for an option last used `distance` generations ago.
    ///
    /// `soft_penalty` at distance 0, rising geometrically to 1.0 once the
    /// distance reaches the window.
    pub fn penalty(&self, soft_window: usize, distance: Option<usize>) -> f64 {
        match distance {
            Some(d) if d < soft_window => {
                let closeness = (soft_window - d) as f64 / soft_window as f64;
                self.settings.soft_penalty.powf(closeness)
            }
            _ => 1.0,
        }
    }

    /// Split `category`'s options into excluded and eligible-with-weights.
    pub fn evaluate<'c>(&self, category: &'c Category, history: &HistoryLog) -> ConstraintState<'c> {
        let distances = history.distances(&category.name);
        let soft_window = self.soft_window_for(category);

        let mut excluded = Vec::new();
        let mut eligible = Vec::new();

        for option in category.options() {
            let last_used = distances.get(option.id.as_str()).copied();
            if matches!(last_used, Some(d) if d < option.min_interval) {
                excluded.push(option.id.as_str());
                continue;
            }
            eligible.push(Candidate {
                option,
                weight: option.weight * self.penalty(soft_window, last_used),
                last_used,
            });
        }

        if !eligible.is_empty() {
            return ConstraintState {
                category,
                excluded,
                eligible,
                fallback: false,
            };
        }

        // Everything is cooling down: admit the option used longest ago,
        // first in catalog order on ties.
        let mut best: Option<(&CatalogOption, usize)> = None;
        for option in category.options() {
            let d = distances.get(option.id.as_str()).copied().unwrap_or(usize::MAX);
            if best.map_or(true, |(_, bd)| d > bd) {
                best = Some((option, d));
            }
        }

        let mut eligible = Vec::with_capacity(1);
        if let Some((option, d)) = best {
            tracing::debug!(
                category = %category.name,
                option = %option.id,
                distance = d,
                "all options on cooldown; admitting least recently used"
            );
            excluded.retain(|id| *id != option.id);
            eligible.push(Candidate {
                option,
                weight: option.weight,
                last_used: Some(d),
            });
        }

        ConstraintState {
            category,
            excluded,
            eligible,
            fallback: true,
        }
    }
}
