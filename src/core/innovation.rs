/// Innovation factors: which innovation-group picks become active tags.
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::schema::blueprint::Choice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnovationSettings {
    /// Factors active even at randomization level 0.
    pub base_count: usize,
    /// Extra factors unlocked linearly as the level approaches 1.
    pub extra_count: usize,
}

impl Default for InnovationSettings {
    fn default() -> Self {
        Self {
            base_count: 2,
            extra_count: 4,
        }
    }
}

impl InnovationSettings {
    /// `base + floor(level * extra)`, capped at the number of groups.
    pub fn active_count(&self, level: f64, groups: usize) -> usize {
        let extra = (level.clamp(0.0, 1.0) * self.extra_count as f64).floor() as usize;
        (self.base_count + extra).min(groups)
    }

    /// Pick which innovation-group choices become active factor tags.
    ///
    /// `group_choices` are the blueprint's choices for innovation categories
    /// in catalog order; the result keeps that order.
    pub fn activate(&self, group_choices: &[&Choice], level: f64, rng: &mut StdRng) -> Vec<String> {
        let count = self.active_count(level, group_choices.len());
        let mut picked = index::sample(rng, group_choices.len(), count).into_vec();
        picked.sort_unstable();
        picked
            .into_iter()
            .map(|i| group_choices[i].option.clone())
            .collect()
    }
}
