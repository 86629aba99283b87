/// Blueprint types: the engine's answer to one request.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a category's option was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceSource {
    /// Drawn by the weighted selector from the eligible set.
    Sampled,
    /// Every option was on cooldown; the least-recently-used one was admitted.
    Fallback,
    /// Fixed by the caller through a category override.
    Pinned,
}

/// The option chosen for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub category: String,
    pub option: String,
    pub source: ChoiceSource,
    /// Free-form attributes of the chosen option (e.g. `pacing`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A finalized story blueprint: one option per category plus the active
/// innovation factors, ready to hand to a content generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Short hex id derived from the selections, sequence and timestamp.
    pub variant_id: String,
    /// Sequence number of the history record this blueprint produced.
    pub sequence: u64,
    pub theme: String,
    /// Choices in catalog category order.
    pub choices: Vec<Choice>,
    pub innovation_factors: Vec<String>,
    /// Randomization level the selection actually ran with.
    pub randomization_level: f64,
}

impl Blueprint {
    /// The option chosen for `category`, if the blueprint covers it.
    pub fn option_for(&self, category: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.option.as_str())
    }

    /// An attribute of the option chosen for `category`.
    pub fn attribute(&self, category: &str, key: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| c.category == category)
            .and_then(|c| c.attributes.get(key))
            .map(String::as_str)
    }

    /// Category → option map, as stored in history.
    pub fn selections(&self) -> BTreeMap<String, String> {
        selections_of(&self.choices)
    }
}

/// Collapse a choice list into the category → option map kept in history.
pub fn selections_of(choices: &[Choice]) -> BTreeMap<String, String> {
    choices
        .iter()
        .map(|c| (c.category.clone(), c.option.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blueprint() -> Blueprint {
        Blueprint {
            variant_id: "abcdef012345".to_string(),
            sequence: 3,
            theme: "cultivation".to_string(),
            choices: vec![
                Choice {
                    category: "structure".to_string(),
                    option: "time_loop".to_string(),
                    source: ChoiceSource::Sampled,
                    attributes: BTreeMap::from([(
                        "pacing".to_string(),
                        "spiral".to_string(),
                    )]),
                },
                Choice {
                    category: "tone".to_string(),
                    option: "wry".to_string(),
                    source: ChoiceSource::Pinned,
                    attributes: BTreeMap::new(),
                },
            ],
            innovation_factors: vec!["memory_exchange".to_string()],
            randomization_level: 0.8,
        }
    }

    #[test]
    fn option_lookup() {
        let bp = make_blueprint();
        assert_eq!(bp.option_for("structure"), Some("time_loop"));
        assert_eq!(bp.option_for("tone"), Some("wry"));
        assert_eq!(bp.option_for("flavor"), None);
    }

    #[test]
    fn attribute_lookup() {
        let bp = make_blueprint();
        assert_eq!(bp.attribute("structure", "pacing"), Some("spiral"));
        assert_eq!(bp.attribute("tone", "pacing"), None);
    }

    #[test]
    fn selections_map() {
        let map = make_blueprint().selections();
        assert_eq!(map.len(), 2);
        assert_eq!(map["structure"], "time_loop");
    }

    #[test]
    fn ron_round_trip() {
        let bp = make_blueprint();
        let serialized = ron::to_string(&bp).unwrap();
        let deserialized: Blueprint = ron::from_str(&serialized).unwrap();
        assert_eq!(deserialized, bp);
    }
}
