/// Adaptive randomization: raises exploration when diversity sags.
///
/// The transition is a pure function over [`AdaptiveState`]; the controller
/// only holds the current state behind a lock so concurrent generations see
/// one consistent level.
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::schema::report::DiversityReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveSettings {
    /// Level at process start and after an operator reset.
    pub default_level: f64,
    /// Increase applied after each low-scoring generation.
    pub step: f64,
    /// Scores below this count as a diversity dip.
    pub low_score_threshold: f64,
    /// Consecutive healthy generations before the level decays.
    pub healthy_streak: u32,
    /// Decrease per decay, never below `default_level`.
    pub decay_step: f64,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            default_level: 0.8,
            step: 0.05,
            low_score_threshold: 0.6,
            healthy_streak: 5,
            decay_step: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveState {
    pub level: f64,
    /// Healthy generations since the last dip or decay.
    pub healthy_run: u32,
}

impl AdaptiveState {
    pub fn initial(settings: &AdaptiveSettings) -> Self {
        Self {
            level: settings.default_level.clamp(0.0, 1.0),
            healthy_run: 0,
        }
    }

    /// Next state after observing `report`.
    pub fn next(self, settings: &AdaptiveSettings, report: &DiversityReport) -> Self {
        if report.score < settings.low_score_threshold {
            return Self {
                level: (self.level + settings.step).min(1.0),
                healthy_run: 0,
            };
        }

        let healthy_run = self.healthy_run.saturating_add(1);
        if healthy_run >= settings.healthy_streak && self.level > settings.default_level {
            Self {
                level: (self.level - settings.decay_step).max(settings.default_level),
                healthy_run: 0,
            }
        } else {
            Self {
                level: self.level,
                healthy_run,
            }
        }
    }
}

/// Owner of the process-wide randomization level.
///
/// Created at startup, updated after every generation, read before each
/// selection, reset only by [`AdaptiveController::reset`].
#[derive(Debug)]
pub struct AdaptiveController {
    settings: AdaptiveSettings,
    state: Mutex<AdaptiveState>,
}

impl AdaptiveController {
    pub fn new(settings: AdaptiveSettings) -> Self {
        let state = AdaptiveState::initial(&settings);
        Self {
            settings,
            state: Mutex::new(state),
        }
    }

    pub fn settings(&self) -> &AdaptiveSettings {
        &self.settings
    }

    pub fn level(&self) -> f64 {
        self.state.lock().level
    }

    pub fn state(&self) -> AdaptiveState {
        *self.state.lock()
    }

    /// Fold a new report into the state and return the resulting level.
    pub fn observe(&self, report: &DiversityReport) -> f64 {
        let mut state = self.state.lock();
        let previous = state.level;
        *state = state.next(&self.settings, report);
        if state.level > previous {
            tracing::warn!(
                score = report.score,
                level = state.level,
                "diversity below threshold; raising randomization"
            );
        } else if state.level < previous {
            tracing::debug!(level = state.level, "diversity healthy; easing randomization");
        }
        state.level
    }

    pub fn reset(&self) {
        *self.state.lock() = AdaptiveState::initial(&self.settings);
        tracing::info!(level = self.settings.default_level, "randomization level reset");
    }
}
