/// The blueprint pipeline: request → constrained selection → scoring →
/// history → adaptive feedback.
///
/// Wires together the catalog, constraint evaluator, weighted selector,
/// diversity scorer, history log and adaptive controller.
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::core::adaptive::AdaptiveController;
use crate::core::catalog::{CatalogError, ElementCatalog};
use crate::core::config::{EngineConfig, RandomizationPreset};
use crate::core::constraint::ConstraintEvaluator;
use crate::core::diversity::DiversityScorer;
use crate::core::history::{HistoryError, HistoryLog};
use crate::core::innovation::InnovationSettings;
use crate::core::observer::{GenerationObserver, GenerationTelemetry};
use crate::core::selector::WeightedSelector;
use crate::schema::blueprint::{selections_of, Blueprint, Choice, ChoiceSource};
use crate::schema::record::SelectionRecord;
use crate::schema::report::{DiversityReport, HistoryAnalysis};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] CatalogError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("override names unknown category '{0}'")]
    UnknownCategory(String),
    #[error("override for category '{category}' names unknown option '{option}'")]
    InvalidOverride { category: String, option: String },
    #[error("randomization level {0} is outside [0, 1]")]
    InvalidLevel(f64),
}

/// Failure of [`BlueprintEngine::generate_with`].
#[derive(Debug, Error)]
pub enum GenerateError<E> {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("content generation failed: {0}")]
    Content(#[source] E),
}

/// An inbound request for one blueprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlueprintRequest {
    pub theme: String,
    /// Category → option pins that bypass selection.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    /// Replaces the adaptive level for this request only.
    #[serde(default)]
    pub randomization_level: Option<f64>,
}

impl BlueprintRequest {
    pub fn new(theme: &str) -> Self {
        Self {
            theme: theme.to_string(),
            ..Self::default()
        }
    }

    pub fn pin(mut self, category: &str, option: &str) -> Self {
        self.overrides
            .insert(category.to_string(), option.to_string());
        self
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.randomization_level = Some(level);
        self
    }

    pub fn with_preset(self, preset: RandomizationPreset) -> Self {
        self.with_level(preset.level())
    }
}

/// A finalized blueprint together with its diversity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub blueprint: Blueprint,
    pub report: DiversityReport,
}

/// What the external content generator receives.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub blueprint: &'a Blueprint,
    pub recommendations: &'a [String],
    pub theme: &'a str,
}

/// The collaborator that turns a blueprint into text. Called with no
/// engine lock held.
pub trait ContentGenerator {
    type Output;
    type Error;

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Self::Output, Self::Error>;
}

/// The top-level selection engine. Built via `BlueprintEngine::builder()`.
///
/// Shared freely across threads: selections run under a read lock on the
/// history, and each record is scored and appended under one write lock.
pub struct BlueprintEngine {
    catalog: ElementCatalog,
    evaluator: ConstraintEvaluator,
    selector: WeightedSelector,
    scorer: DiversityScorer,
    innovation: InnovationSettings,
    history: RwLock<HistoryLog>,
    controller: AdaptiveController,
    observers: Vec<Arc<dyn GenerationObserver>>,
    seed: u64,
    request_count: AtomicU64,
}

/// Builder for constructing a `BlueprintEngine`.
pub struct BlueprintEngineBuilder {
    config_path: Option<PathBuf>,
    history_path: Option<PathBuf>,
    seed: u64,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
    /// Directly provided history (for testing without files).
    history: Option<HistoryLog>,
    observers: Vec<Arc<dyn GenerationObserver>>,
}

impl BlueprintEngine {
    pub fn builder() -> BlueprintEngineBuilder {
        BlueprintEngineBuilder {
            config_path: None,
            history_path: None,
            seed: 0,
            config: None,
            history: None,
            observers: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    /// Level the next selection will run with, absent a request override.
    pub fn randomization_level(&self) -> f64 {
        self.controller.level()
    }

    /// Operator reset of the adaptive level to its configured default.
    pub fn reset_randomization(&self) {
        self.controller.reset();
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    /// Run `f` against a consistent snapshot of the history.
    pub fn with_history<R>(&self, f: impl FnOnce(&HistoryLog) -> R) -> R {
        f(&self.history.read())
    }

    pub fn last_used_at(&self, category: &str, option: &str) -> Option<usize> {
        self.history.read().last_used_at(category, option)
    }

    /// Produce, score and record one blueprint.
    ///
    /// Overrides are checked before anything else; a bad override fails the
    /// request without touching history. The record is appended only once
    /// the blueprint is final.
    pub fn request_blueprint(
        &self,
        request: &BlueprintRequest,
    ) -> Result<GenerationOutcome, EngineError> {
        self.check_request(request)?;

        let level = request
            .randomization_level
            .unwrap_or_else(|| self.controller.level());
        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(count));

        // 1. Select under a shared snapshot of history
        let choices = {
            let history = self.history.read();
            history.verify()?;
            self.select_all(&history, request, level, &mut rng)
        };

        // 2. Activate innovation factors from the innovation-group picks
        let group_choices: Vec<&Choice> = choices
            .iter()
            .filter(|c| {
                self.catalog
                    .category(&c.category)
                    .is_some_and(|cat| cat.is_innovation())
            })
            .collect();
        let innovation_factors = self.innovation.activate(&group_choices, level, &mut rng);

        // 3. Score, append and feed the score back in append order
        let (report, sequence, timestamp, next_level) = {
            let mut history = self.history.write();
            let report = self
                .scorer
                .score(&choices, history.window(self.scorer.settings().analysis_window));
            let sequence = history.next_sequence();
            let timestamp = Utc::now();
            history.append(SelectionRecord {
                sequence,
                timestamp,
                selections: selections_of(&choices),
                innovation_factors: innovation_factors.iter().cloned().collect(),
                diversity_score: report.score,
            })?;
            let next_level = self.controller.observe(&report);
            (report, sequence, timestamp, next_level)
        };

        let blueprint = Blueprint {
            variant_id: variant_id(&choices, sequence, &timestamp),
            sequence,
            theme: request.theme.clone(),
            choices,
            innovation_factors,
            randomization_level: level,
        };

        tracing::info!(
            sequence,
            variant = %blueprint.variant_id,
            score = report.score,
            level,
            next_level,
            "blueprint finalized"
        );

        let telemetry = GenerationTelemetry {
            sequence,
            score: report.score,
            recommendations: report.recommendations.clone(),
            randomization_level: next_level,
        };
        for observer in &self.observers {
            observer.observe(&telemetry);
        }

        Ok(GenerationOutcome { blueprint, report })
    }

    /// Finalize a blueprint, then hand it to `generator` with no lock held.
    ///
    /// The blueprint stays recorded even if generation fails.
    pub fn generate_with<G: ContentGenerator>(
        &self,
        request: &BlueprintRequest,
        generator: &G,
    ) -> Result<(GenerationOutcome, G::Output), GenerateError<G::Error>> {
        let outcome = self.request_blueprint(request)?;
        let output = generator
            .generate(&GenerationRequest {
                blueprint: &outcome.blueprint,
                recommendations: &outcome.report.recommendations,
                theme: &request.theme,
            })
            .map_err(GenerateError::Content)?;
        Ok((outcome, output))
    }

    /// Frequency and entropy analysis over the last `recent` records.
    pub fn analyze(&self, recent: usize) -> HistoryAnalysis {
        let history = self.history.read();
        self.scorer.analyze(&self.catalog, history.window(recent))
    }

    /// Per category, the options used in the last `recent` records.
    pub fn avoidance_snapshot(&self, recent: usize) -> BTreeMap<String, BTreeSet<String>> {
        let history = self.history.read();
        self.catalog
            .categories()
            .iter()
            .map(|cat| (cat.name.clone(), history.recently_used(&cat.name, recent)))
            .collect()
    }

    pub fn save_history(&self, path: &Path) -> Result<(), EngineError> {
        self.history.read().save_ron(path)?;
        Ok(())
    }

    fn check_request(&self, request: &BlueprintRequest) -> Result<(), EngineError> {
        if let Some(level) = request.randomization_level {
            if !(0.0..=1.0).contains(&level) {
                return Err(EngineError::InvalidLevel(level));
            }
        }
        for (category, option) in &request.overrides {
            let cat = self
                .catalog
                .category(category)
                .ok_or_else(|| EngineError::UnknownCategory(category.clone()))?;
            if cat.option(option).is_none() {
                return Err(EngineError::InvalidOverride {
                    category: category.clone(),
                    option: option.clone(),
                });
            }
        }
        Ok(())
    }

    fn select_all(
        &self,
        history: &HistoryLog,
        request: &BlueprintRequest,
        level: f64,
        rng: &mut StdRng,
    ) -> Vec<Choice> {
        let mut choices = Vec::with_capacity(self.catalog.len());

        for category in self.catalog.categories() {
            let pinned = request
                .overrides
                .get(&category.name)
                .and_then(|id| category.option(id));
            if let Some(option) = pinned {
                choices.push(Choice {
                    category: category.name.clone(),
                    option: option.id.clone(),
                    source: ChoiceSource::Pinned,
                    attributes: option.attributes.clone(),
                });
                continue;
            }

            let state = self.evaluator.evaluate(category, history);
            let option = self.selector.select(&state, level, rng);
            tracing::debug!(
                category = %category.name,
                option = %option.id,
                eligible = state.eligible.len(),
                excluded = state.excluded.len(),
                fallback = state.fallback,
                "category selected"
            );
            choices.push(Choice {
                category: category.name.clone(),
                option: option.id.clone(),
                source: if state.fallback {
                    ChoiceSource::Fallback
                } else {
                    ChoiceSource::Sampled
                },
                attributes: option.attributes.clone(),
            });
        }

        choices
    }
}

/// 12 hex digits hashed from the selections, sequence and timestamp.
fn variant_id(choices: &[Choice], sequence: u64, timestamp: &DateTime<Utc>) -> String {
    let mut hasher = FxHasher::default();
    for choice in choices {
        choice.category.hash(&mut hasher);
        choice.option.hash(&mut hasher);
    }
    sequence.hash(&mut hasher);
    timestamp.to_rfc3339().hash(&mut hasher);
    let digest = format!("{:016x}", hasher.finish());
    digest[..12].to_string()
}

impl BlueprintEngineBuilder {
    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(PathBuf::from(path));
        self
    }

    /// Restore history from a file saved by [`BlueprintEngine::save_history`].
    /// A missing file starts an empty history.
    pub fn history_path(mut self, path: &str) -> Self {
        self.history_path = Some(PathBuf::from(path));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn GenerationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Provide config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide history directly (for testing without files).
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> Result<BlueprintEngine, EngineError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::shipped()?,
        };
        let catalog = config.validate()?;

        let history = match (self.history, self.history_path) {
            (Some(history), _) => Some(history),
            (None, Some(path)) if path.exists() => Some(HistoryLog::load_ron(&path)?),
            _ => None,
        };
        // Re-home restored records into the configured capacity
        let history = match history {
            Some(log) if log.capacity() != config.history_capacity => HistoryLog::restore(
                config.history_capacity,
                log.iter_chronological().cloned().collect(),
            ),
            Some(log) => log,
            None => HistoryLog::new(config.history_capacity),
        };

        tracing::debug!(
            categories = catalog.len(),
            history = history.len(),
            seed = self.seed,
            "blueprint engine built"
        );

        Ok(BlueprintEngine {
            catalog,
            evaluator: ConstraintEvaluator::new(config.avoidance),
            selector: WeightedSelector,
            scorer: DiversityScorer::new(config.scoring),
            innovation: config.innovation,
            history: RwLock::new(history),
            controller: AdaptiveController::new(config.adaptive),
            observers: self.observers,
            seed: self.seed,
            request_count: AtomicU64::new(0),
        })
    }
}
