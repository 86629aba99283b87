/// Element catalog: the fixed registry of categories and their options.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog defines no categories")]
    NoCategories,
    #[error("category '{0}' has no options")]
    EmptyCategory(String),
    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),
    #[error("duplicate option '{option}' in category '{category}'")]
    DuplicateOption { category: String, option: String },
    #[error("option '{option}' in category '{category}' has invalid weight {weight} (must be > 0)")]
    InvalidWeight {
        category: String,
        option: String,
        weight: f64,
    },
    #[error("option '{option}' in category '{category}' has negative minimum interval {interval}")]
    NegativeInterval {
        category: String,
        option: String,
        interval: i64,
    },
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Whether a category is a core blueprint axis or an innovation-factor group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CategoryKind {
    #[default]
    Core,
    Innovation,
}

/// An option as written in a config file, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub id: String,
    pub weight: f64,
    #[serde(default)]
    pub min_interval: i64,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A category as written in a config file, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub kind: CategoryKind,
    /// Overrides the global soft-avoidance window for this category.
    #[serde(default)]
    pub soft_window: Option<usize>,
    pub options: Vec<OptionSpec>,
}

/// A validated option.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOption {
    pub id: String,
    pub weight: f64,
    /// Generations that must pass before the option may be chosen again.
    pub min_interval: usize,
    pub attributes: BTreeMap<String, String>,
}

/// A validated category with its options in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub kind: CategoryKind,
    pub soft_window: Option<usize>,
    options: Vec<CatalogOption>,
}

impl Category {
    pub fn options(&self) -> &[CatalogOption] {
        &self.options
    }

    pub fn option(&self, id: &str) -> Option<&CatalogOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn is_innovation(&self) -> bool {
        self.kind == CategoryKind::Innovation
    }
}

/// Immutable registry of categories. Built once from config and shared
/// read-only by every selection.
#[derive(Debug, Clone)]
pub struct ElementCatalog {
    categories: Vec<Category>,
    index: FxHashMap<String, usize>,
}

impl ElementCatalog {
    /// Validate raw category specs and build the catalog.
    ///
    /// Rejects an empty catalog, empty categories, duplicate names,
    /// non-positive or non-finite weights and negative intervals.
    pub fn from_specs(specs: Vec<CategorySpec>) -> Result<ElementCatalog, CatalogError> {
        if specs.is_empty() {
            return Err(CatalogError::NoCategories);
        }

        let mut categories = Vec::with_capacity(specs.len());
        let mut index = FxHashMap::default();

        for spec in specs {
            if index.contains_key(&spec.name) {
                return Err(CatalogError::DuplicateCategory(spec.name));
            }
            if spec.options.is_empty() {
                return Err(CatalogError::EmptyCategory(spec.name));
            }

            let mut seen = FxHashSet::default();
            let mut options = Vec::with_capacity(spec.options.len());
            for opt in spec.options {
                if !seen.insert(opt.id.clone()) {
                    return Err(CatalogError::DuplicateOption {
                        category: spec.name,
                        option: opt.id,
                    });
                }
                if !(opt.weight > 0.0 && opt.weight.is_finite()) {
                    return Err(CatalogError::InvalidWeight {
                        category: spec.name,
                        option: opt.id,
                        weight: opt.weight,
                    });
                }
                let min_interval =
                    usize::try_from(opt.min_interval).map_err(|_| CatalogError::NegativeInterval {
                        category: spec.name.clone(),
                        option: opt.id.clone(),
                        interval: opt.min_interval,
                    })?;
                options.push(CatalogOption {
                    id: opt.id,
                    weight: opt.weight,
                    min_interval,
                    attributes: opt.attributes,
                });
            }

            index.insert(spec.name.clone(), categories.len());
            categories.push(Category {
                name: spec.name,
                kind: spec.kind,
                soft_window: spec.soft_window,
                options,
            });
        }

        Ok(ElementCatalog { categories, index })
    }

    /// All categories in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.index.get(name).map(|&i| &self.categories[i])
    }

    pub fn options_of(&self, category: &str) -> Option<&[CatalogOption]> {
        self.category(category).map(Category::options)
    }

    pub fn weight_of(&self, category: &str, option: &str) -> Option<f64> {
        self.category(category)?.option(option).map(|o| o.weight)
    }

    pub fn innovation_groups(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.is_innovation())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
