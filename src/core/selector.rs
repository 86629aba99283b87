/// Weighted selection under constraints.
///
/// The core is a pure function from (weights, randomization level, one
/// uniform draw) to an index, so callers control all randomness.
use rand::rngs::StdRng;
use rand::Rng;

use crate::core::catalog::CatalogOption;
use crate::core::constraint::ConstraintState;

/// Randomization levels at or below this pick among the heaviest options only.
pub const MIN_LEVEL: f64 = 1e-3;

/// Reshape adjusted weights for a randomization level.
///
/// Each weight becomes `(w / max) ^ (1 / level)`. Dividing by the largest
/// weight first keeps the result in (0, 1] for any level and leaves the
/// distribution unchanged. Low levels concentrate mass on the heaviest
/// option; level 1 keeps plain proportional weights. At or below
/// [`MIN_LEVEL`] the mass is split evenly across the options tied for the
/// largest weight.
pub fn effective_weights(weights: &[f64], level: f64) -> Vec<f64> {
    let max = weights.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return vec![1.0; weights.len()];
    }
    if level <= MIN_LEVEL {
        let ties = weights.iter().filter(|w| **w == max).count() as f64;
        return weights
            .iter()
            .map(|w| if *w == max { 1.0 / ties } else { 0.0 })
            .collect();
    }
    let exponent = 1.0 / level.min(1.0);
    weights.iter().map(|w| (w / max).powf(exponent)).collect()
}

/// Probability of drawing each option at `level`.
pub fn selection_probabilities(weights: &[f64], level: f64) -> Vec<f64> {
    let effective = effective_weights(weights, level);
    let total: f64 = effective.iter().sum();
    effective.iter().map(|w| w / total).collect()
}

/// Inverse-transform sampling: map `draw` in [0, 1) onto the cumulative
/// effective-weight distribution and return the chosen index.
///
/// Panics if `weights` is empty.
pub fn pick_index(weights: &[f64], level: f64, draw: f64) -> usize {
    assert!(!weights.is_empty(), "cannot pick from an empty eligible set");
    let effective = effective_weights(weights, level);
    let total: f64 = effective.iter().sum();
    let target = draw.clamp(0.0, 1.0) * total;

    let mut cumulative = 0.0;
    for (i, w) in effective.iter().enumerate() {
        cumulative += w;
        if target < cumulative {
            return i;
        }
    }
    // draw == 1.0 or rounding at the top end
    effective
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(effective.len() - 1)
}

/// Draws one option per category from its constraint state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSelector;

impl WeightedSelector {
    /// Pick one eligible option. Reads nothing but `state` and the RNG;
    /// recording the outcome is the caller's job.
    pub fn select<'a>(
        &self,
        state: &ConstraintState<'a>,
        level: f64,
        rng: &mut StdRng,
    ) -> &'a CatalogOption {
        let weights: Vec<f64> = state.eligible.iter().map(|c| c.weight).collect();
        let draw: f64 = rng.gen();
        state.eligible[pick_index(&weights, level, draw)].option
    }
}
