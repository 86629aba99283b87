/// Engine configuration: catalog plus tuning, loaded once from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::core::adaptive::AdaptiveSettings;
use crate::core::catalog::{CatalogError, CategorySpec, ElementCatalog};
use crate::core::constraint::AvoidanceSettings;
use crate::core::diversity::ScoringSettings;
use crate::core::history::DEFAULT_CAPACITY;
use crate::core::innovation::InnovationSettings;

/// The catalog and tuning shipped with the crate.
pub const DEFAULT_CATALOG: &str = include_str!("../../catalog_data/default.ron");

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Everything the engine reads at startup. Read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default)]
    pub avoidance: AvoidanceSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub adaptive: AdaptiveSettings,
    #[serde(default)]
    pub innovation: InnovationSettings,
    pub categories: Vec<CategorySpec>,
}

impl EngineConfig {
    /// A config with default tuning around the given categories.
    pub fn with_categories(categories: Vec<CategorySpec>) -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            avoidance: AvoidanceSettings::default(),
            scoring: ScoringSettings::default(),
            adaptive: AdaptiveSettings::default(),
            innovation: InnovationSettings::default(),
            categories,
        }
    }

    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, CatalogError> {
        Ok(ron::from_str(input)?)
    }

    /// Parse [`DEFAULT_CATALOG`].
    pub fn shipped() -> Result<EngineConfig, CatalogError> {
        Self::parse_ron(DEFAULT_CATALOG)
    }

    /// Check tuning values and build the catalog.
    pub fn validate(&self) -> Result<ElementCatalog, CatalogError> {
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be at least 1"));
        }
        let penalty = self.avoidance.soft_penalty;
        if !(penalty > 0.0 && penalty <= 1.0) {
            return Err(invalid(
                "avoidance.soft_penalty",
                format!("{} is outside (0, 1]", penalty),
            ));
        }
        if !(0.0..=1.0).contains(&self.adaptive.default_level) {
            return Err(invalid(
                "adaptive.default_level",
                format!("{} is outside [0, 1]", self.adaptive.default_level),
            ));
        }
        if !(self.adaptive.step >= 0.0 && self.adaptive.decay_step >= 0.0) {
            return Err(invalid("adaptive.step", "steps must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.scoring.warning_threshold) {
            return Err(invalid(
                "scoring.warning_threshold",
                format!("{} is outside [0, 1]", self.scoring.warning_threshold),
            ));
        }
        ElementCatalog::from_specs(self.categories.clone())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidSetting {
        name,
        reason: reason.into(),
    }
}

/// Named randomization levels for common generation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RandomizationPreset {
    QuickTest,
    Standard,
    Epic,
    Experimental,
}

impl RandomizationPreset {
    pub fn level(&self) -> f64 {
        match self {
            Self::QuickTest => 0.6,
            Self::Standard => 0.8,
            Self::Epic => 0.9,
            Self::Experimental => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::QuickTest => "quick_test",
            Self::Standard => "standard",
            Self::Epic => "epic",
            Self::Experimental => "experimental",
        }
    }

    pub fn all() -> [RandomizationPreset; 4] {
        [Self::QuickTest, Self::Standard, Self::Epic, Self::Experimental]
    }
}

impl FromStr for RandomizationPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|p| p.name() == s.to_lowercase())
            .ok_or_else(|| format!("unknown preset '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"(
        categories: [
            (
                name: "structure",
                options: [
                    (id: "A", weight: 1.0, min_interval: 3),
                    (id: "B", weight: 1.0),
                ],
            ),
        ],
    )"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = EngineConfig::parse_ron(MINIMAL).unwrap();
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.avoidance, AvoidanceSettings::default());
        assert_eq!(config.scoring.analysis_window, 10);
        assert_eq!(config.adaptive.default_level, 0.8);
        assert_eq!(config.innovation.base_count, 2);
        let catalog = config.validate().unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let input = r#"(
            history_capacity: 12,
            avoidance: (soft_window: 4),
            categories: [(name: "tone", options: [(id: "wry", weight: 2.0)])],
        )"#;
        let config = EngineConfig::parse_ron(input).unwrap();
        assert_eq!(config.history_capacity, 12);
        assert_eq!(config.avoidance.soft_window, 4);
        assert_eq!(config.avoidance.soft_penalty, 0.35);
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut config = EngineConfig::parse_ron(MINIMAL).unwrap();
        config.history_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(CatalogError::InvalidSetting { name: "history_capacity", .. })
        ));

        let mut config = EngineConfig::parse_ron(MINIMAL).unwrap();
        config.avoidance.soft_penalty = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::parse_ron(MINIMAL).unwrap();
        config.adaptive.default_level = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_interval_in_file_rejected() {
        let input = r#"(categories: [(name: "s", options: [(id: "A", weight: 1.0, min_interval: -1)])])"#;
        let config = EngineConfig::parse_ron(input).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CatalogError::NegativeInterval { .. })
        ));
    }

    #[test]
    fn malformed_ron_is_error() {
        assert!(matches!(
            EngineConfig::parse_ron("(categories: [oops"),
            Err(CatalogError::Ron(_))
        ));
    }

    #[test]
    fn presets_parse() {
        assert_eq!("epic".parse::<RandomizationPreset>().unwrap().level(), 0.9);
        assert_eq!(
            "Quick_Test".parse::<RandomizationPreset>().unwrap(),
            RandomizationPreset::QuickTest
        );
        assert!("wild".parse::<RandomizationPreset>().is_err());
    }

    #[test]
    fn shipped_default_catalog_is_valid() {
        let config = EngineConfig::shipped().unwrap();
        let catalog = config.validate().unwrap();
        assert!(catalog.category("structure").is_some());
        assert!(catalog.innovation_groups().count() >= 4);
    }

    #[test]
    fn shipped_file_matches_embedded_copy() {
        let from_file =
            EngineConfig::load_from_ron(Path::new("catalog_data/default.ron")).unwrap();
        assert_eq!(from_file.categories, EngineConfig::shipped().unwrap().categories);
    }
}
