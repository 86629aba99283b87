//! WASM bindings for blueprint-engine: request blueprints from the browser.

use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

use blueprint_engine::core::config::{EngineConfig, RandomizationPreset};
use blueprint_engine::core::pipeline::{BlueprintEngine, BlueprintRequest};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct RequestInput {
    #[serde(default)]
    theme: String,
    #[serde(default)]
    overrides: BTreeMap<String, String>,
    /// Explicit level in [0, 1]; wins over `preset`.
    randomization_level: Option<f64>,
    /// One of the preset names, e.g. "epic".
    preset: Option<String>,
}

#[derive(serde::Serialize)]
struct CategoryInfo {
    name: String,
    innovation: bool,
    options: Vec<String>,
}

#[derive(serde::Serialize)]
struct PresetInfo {
    name: &'static str,
    level: f64,
}

fn to_request(input: RequestInput) -> Result<BlueprintRequest, JsError> {
    let level = match (input.randomization_level, input.preset) {
        (Some(level), _) => Some(level),
        (None, Some(name)) => Some(
            name.parse::<RandomizationPreset>()
                .map_err(|e| JsError::new(&e))?
                .level(),
        ),
        (None, None) => None,
    };
    Ok(BlueprintRequest {
        theme: input.theme,
        overrides: input.overrides,
        randomization_level: level,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

// ---------------------------------------------------------------------------
// WasmBlueprintEngine
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct WasmBlueprintEngine {
    engine: BlueprintEngine,
}

#[wasm_bindgen]
impl WasmBlueprintEngine {
    /// Create an engine over the shipped catalog.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<WasmBlueprintEngine, JsError> {
        let engine = BlueprintEngine::builder()
            .seed(seed)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(WasmBlueprintEngine { engine })
    }

    /// Create an engine over a caller-supplied RON config.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_ron: &str, seed: u64) -> Result<WasmBlueprintEngine, JsError> {
        let config = EngineConfig::parse_ron(config_ron)
            .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?;
        let engine = BlueprintEngine::builder()
            .seed(seed)
            .with_config(config)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(WasmBlueprintEngine { engine })
    }

    /// Request one blueprint. Returns `{ blueprint, report }` as JSON.
    ///
    /// Expected JSON shape:
    /// ```json
    /// {
    ///   "theme": "cultivation",
    ///   "overrides": { "structure": "time_loop" },
    ///   "preset": "epic"
    /// }
    /// ```
    #[wasm_bindgen(js_name = requestBlueprint)]
    pub fn request_blueprint(&self, request_json: &str) -> Result<String, JsError> {
        let input: RequestInput = serde_json::from_str(request_json)
            .map_err(|e| JsError::new(&format!("Invalid request JSON: {e}")))?;
        let request = to_request(input)?;
        let outcome = self
            .engine
            .request_blueprint(&request)
            .map_err(|e| JsError::new(&format!("Request error: {e}")))?;
        to_json(&outcome)
    }

    /// History analysis over the last `recent` generations, as JSON.
    pub fn analyze(&self, recent: usize) -> Result<String, JsError> {
        to_json(&self.engine.analyze(recent))
    }

    /// Options used per category in the last `recent` generations, as JSON.
    #[wasm_bindgen(js_name = avoidanceSnapshot)]
    pub fn avoidance_snapshot(&self, recent: usize) -> Result<String, JsError> {
        to_json(&self.engine.avoidance_snapshot(recent))
    }

    #[wasm_bindgen(js_name = resetRandomization)]
    pub fn reset_randomization(&self) {
        self.engine.reset_randomization();
    }

    #[wasm_bindgen(js_name = randomizationLevel)]
    pub fn randomization_level(&self) -> f64 {
        self.engine.randomization_level()
    }

    #[wasm_bindgen(js_name = historyLength)]
    pub fn history_length(&self) -> usize {
        self.engine.history_len()
    }

    /// Catalog categories and their option ids, as JSON.
    pub fn categories(&self) -> Result<String, JsError> {
        let infos: Vec<CategoryInfo> = self
            .engine
            .catalog()
            .categories()
            .iter()
            .map(|c| CategoryInfo {
                name: c.name.clone(),
                innovation: c.is_innovation(),
                options: c.options().iter().map(|o| o.id.clone()).collect(),
            })
            .collect();
        to_json(&infos)
    }

    /// Randomization presets, as JSON.
    pub fn presets() -> String {
        let infos: Vec<PresetInfo> = RandomizationPreset::all()
            .iter()
            .map(|p| PresetInfo {
                name: p.name(),
                level: p.level(),
            })
            .collect();
        serde_json::to_string(&infos).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_name_becomes_level() {
        let input: RequestInput =
            serde_json::from_str(r#"{"theme": "x", "preset": "epic"}"#).unwrap();
        let request = to_request(input).ok().unwrap();
        assert_eq!(request.randomization_level, Some(0.9));
    }

    #[test]
    fn explicit_level_wins_over_preset() {
        let input: RequestInput = serde_json::from_str(
            r#"{"theme": "x", "preset": "epic", "randomization_level": 0.3}"#,
        )
        .unwrap();
        let request = to_request(input).ok().unwrap();
        assert_eq!(request.randomization_level, Some(0.3));
    }

    #[test]
    fn presets_json_lists_all() {
        let parsed: serde_json::Value = serde_json::from_str(&WasmBlueprintEngine::presets()).unwrap();
        assert_eq!(parsed.as_array().map(|a| a.len()), Some(4));
    }
}
