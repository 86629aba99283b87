/// Catalog Linter: validates an engine config and flags tuning smells.
///
/// Usage: catalog_linter [config.ron]

use blueprint_engine::core::catalog::{Category, ElementCatalog};
use blueprint_engine::core::config::EngineConfig;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Largest tolerated ratio between a category's heaviest and lightest option.
const MAX_WEIGHT_SPREAD: f64 = 10.0;

#[derive(Parser)]
#[command(name = "catalog_linter")]
#[command(about = "Validate a blueprint engine catalog", long_about = None)]
struct Cli {
    /// Config file to check. Defaults to the shipped catalog.
    config: Option<PathBuf>,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_ron(path),
        None => EngineConfig::shipped(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: Failed to load config: {}", e);
            process::exit(1);
        }
    };

    let catalog = match config.validate() {
        Ok(catalog) => catalog,
        Err(e) => {
            println!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} categories, {} options",
        catalog.len(),
        catalog
            .categories()
            .iter()
            .map(|c| c.options().len())
            .sum::<usize>()
    );

    let warnings = lint_catalog(&catalog, config.avoidance.soft_window);

    println!("\n=== Catalog Lint Report ===\n");

    if warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    println!("\nSummary: 0 errors, {} warnings", warnings.len());

    if cli.strict && !warnings.is_empty() {
        process::exit(1);
    }
}

fn lint_catalog(catalog: &ElementCatalog, default_soft_window: usize) -> Vec<String> {
    let mut warnings = Vec::new();
    for category in catalog.categories() {
        lint_category(
            category,
            category.soft_window.unwrap_or(default_soft_window),
            &mut warnings,
        );
    }
    warnings
}

fn lint_category(category: &Category, soft_window: usize, warnings: &mut Vec<String>) {
    let options = category.options();
    let name = &category.name;

    if options.len() < 2 {
        warnings.push(format!(
            "'{}' has {} option(s); every request will pick the same one",
            name,
            options.len()
        ));
    }

    // Soft avoidance only bites once the hard cooldown has lapsed
    for option in options {
        if option.min_interval > 0 && soft_window <= option.min_interval {
            warnings.push(format!(
                "'{}': soft window {} never outlasts the cooldown of '{}' ({}); the soft penalty has no effect on it",
                name, soft_window, option.id, option.min_interval
            ));
        }
        if option.min_interval >= options.len() {
            warnings.push(format!(
                "'{}': cooldown of '{}' ({}) is not below the option count ({}); fallback will trigger routinely",
                name,
                option.id,
                option.min_interval,
                options.len()
            ));
        }
    }

    let max = options.iter().map(|o| o.weight).fold(f64::MIN, f64::max);
    let min = options.iter().map(|o| o.weight).fold(f64::MAX, f64::min);
    if options.len() >= 2 && max / min > MAX_WEIGHT_SPREAD {
        warnings.push(format!(
            "'{}': weights span {:.1}x ({} to {}); light options will almost never appear",
            name,
            max / min,
            min,
            max
        ));
    }
}
