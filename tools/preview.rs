/// Preview: interactive generation shell for exercising a catalog.
///
/// Usage: preview [--config <path>] [--seed <n>] [--history <path>]
///
/// Commands:
///   gen [theme]          request one blueprint
///   pin <cat>=<opt>      pin a category for subsequent requests
///   unpin [cat]          clear one pin, or all
///   level <x|preset>     override the randomization level ('auto' clears)
///   bulk <n>             request n blueprints and print variety stats
///   analyze [n]          frequency and entropy analysis
///   avoid [n]            options used in the last n generations
///   history [n]          list recent records
///   reset                reset the adaptive randomization level
///   save <path>          write history to a RON file
///   help                 list commands
///   quit                 exit

use blueprint_engine::core::config::RandomizationPreset;
use blueprint_engine::core::observer::TracingObserver;
use blueprint_engine::core::pipeline::{BlueprintEngine, BlueprintRequest, GenerationOutcome};
use blueprint_engine::schema::blueprint::ChoiceSource;
use clap::Parser;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "preview")]
#[command(about = "Interactive blueprint generation shell", long_about = None)]
struct Cli {
    /// Engine config (catalog + tuning). Defaults to the shipped catalog.
    #[arg(short, long, env = "BLUEPRINT_CONFIG")]
    config: Option<String>,

    /// Initial RNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// History file to restore from (if present)
    #[arg(long)]
    history: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = BlueprintEngine::builder()
        .seed(cli.seed)
        .observer(Arc::new(TracingObserver));
    if let Some(ref path) = cli.config {
        builder = builder.config_path(path);
    }
    if let Some(ref path) = cli.history {
        builder = builder.history_path(path);
    }
    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} categories ({} innovation groups)",
        engine.catalog().len(),
        engine.catalog().innovation_groups().count()
    );
    println!("History: {} records", engine.history_len());
    println!("Seed: {}", cli.seed);
    println!("Type 'help' for commands.\n");

    // Session state
    let mut pins: BTreeMap<String, String> = BTreeMap::new();
    let mut level_override: Option<f64> = None;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "gen" | "g" => {
                let theme = if parts.len() > 1 {
                    parts[1..].join(" ")
                } else {
                    "untitled".to_string()
                };
                let request = build_request(&theme, &pins, level_override);
                match engine.request_blueprint(&request) {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "pin" => {
                let Some((category, option)) = parts.get(1).and_then(|p| p.split_once('=')) else {
                    println!("Usage: pin <category>=<option>");
                    print_pins(&pins);
                    continue;
                };
                match engine.catalog().category(category) {
                    None => println!("Unknown category: {}", category),
                    Some(cat) if cat.option(option).is_none() => {
                        let ids: Vec<&str> = cat.options().iter().map(|o| o.id.as_str()).collect();
                        println!("Unknown option '{}'. {} options: {}", option, category, ids.join(", "));
                    }
                    Some(_) => {
                        pins.insert(category.to_string(), option.to_string());
                        println!("Pinned {} = {}", category, option);
                    }
                }
            }
            "unpin" => {
                if let Some(category) = parts.get(1) {
                    if pins.remove(*category).is_some() {
                        println!("Unpinned {}", category);
                    } else {
                        println!("{} was not pinned", category);
                    }
                } else {
                    pins.clear();
                    println!("All pins cleared.");
                }
            }
            "level" => {
                let Some(arg) = parts.get(1) else {
                    match level_override {
                        Some(l) => println!("Level override: {:.2}", l),
                        None => println!("Adaptive level: {:.2}", engine.randomization_level()),
                    }
                    let names: Vec<&str> = RandomizationPreset::all().iter().map(|p| p.name()).collect();
                    println!("  Presets: {}", names.join(", "));
                    continue;
                };
                if *arg == "auto" {
                    level_override = None;
                    println!("Using adaptive level ({:.2})", engine.randomization_level());
                } else if let Ok(preset) = arg.parse::<RandomizationPreset>() {
                    level_override = Some(preset.level());
                    println!("Level set to {} ({:.2})", preset.name(), preset.level());
                } else {
                    match arg.parse::<f64>() {
                        Ok(l) if (0.0..=1.0).contains(&l) => {
                            level_override = Some(l);
                            println!("Level set to {:.2}", l);
                        }
                        _ => println!("Invalid level: {} (expected 0..1 or a preset)", arg),
                    }
                }
            }
            "bulk" => {
                let count: usize = match parts.get(1).map(|s| s.parse()) {
                    Some(Ok(n)) if n > 0 => n,
                    _ => {
                        println!("Usage: bulk <n>");
                        continue;
                    }
                };
                run_bulk(&engine, count, &pins, level_override);
            }
            "analyze" => {
                let recent = parse_count(parts.get(1), 10);
                let analysis = engine.analyze(recent);
                println!(
                    "\n=== Analysis of last {} generations: score {:.3} ===\n",
                    analysis.window_len, analysis.score
                );
                for freq in &analysis.frequencies {
                    let used: Vec<String> = freq
                        .counts
                        .iter()
                        .filter(|(_, n)| *n > 0)
                        .map(|(id, n)| format!("{}×{}", id, n))
                        .collect();
                    println!(
                        "  {:<22} entropy {:.2}  {}",
                        freq.category,
                        freq.normalized_entropy,
                        used.join(" ")
                    );
                }
                if !analysis.recommendations.is_empty() {
                    println!("\nRecommendations:");
                    for r in &analysis.recommendations {
                        println!("  - {}", r);
                    }
                }
                println!();
            }
            "avoid" => {
                let recent = parse_count(parts.get(1), 5);
                for (category, used) in engine.avoidance_snapshot(recent) {
                    if !used.is_empty() {
                        let ids: Vec<&str> = used.iter().map(String::as_str).collect();
                        println!("  {:<22} {}", category, ids.join(", "));
                    }
                }
            }
            "history" => {
                let recent = parse_count(parts.get(1), 10);
                engine.with_history(|history| {
                    for record in history.window(recent) {
                        let structure = record.option_for("structure").unwrap_or("-");
                        let flavor = record.option_for("world_flavor").unwrap_or("-");
                        println!(
                            "  #{:<4} {}  score {:.2}  {} / {}",
                            record.sequence,
                            record.timestamp.format("%H:%M:%S"),
                            record.diversity_score,
                            structure,
                            flavor
                        );
                    }
                });
            }
            "reset" => {
                engine.reset_randomization();
                println!("Randomization level reset to {:.2}", engine.randomization_level());
            }
            "save" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: save <path>");
                    continue;
                };
                match engine.save_history(Path::new(path)) {
                    Ok(()) => println!("Saved {} records to {}", engine.history_len(), path),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  gen [theme]        Request one blueprint");
    println!("  pin <cat>=<opt>    Pin a category for subsequent requests");
    println!("  unpin [cat]        Clear one pin, or all");
    println!("  level <x|preset>   Override randomization level ('auto' to clear)");
    println!("  bulk <n>           Request n blueprints with variety statistics");
    println!("  analyze [n]        Frequency and entropy analysis (default 10)");
    println!("  avoid [n]          Options used in the last n generations (default 5)");
    println!("  history [n]        List recent records (default 10)");
    println!("  reset              Reset the adaptive randomization level");
    println!("  save <path>        Write history to a RON file");
    println!("  help               Show this help");
    println!("  quit               Exit");
}

fn print_pins(pins: &BTreeMap<String, String>) {
    if pins.is_empty() {
        println!("  No pins.");
    }
    for (category, option) in pins {
        println!("  {} = {}", category, option);
    }
}

fn parse_count(arg: Option<&&str>, default: usize) -> usize {
    arg.and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn build_request(
    theme: &str,
    pins: &BTreeMap<String, String>,
    level: Option<f64>,
) -> BlueprintRequest {
    BlueprintRequest {
        theme: theme.to_string(),
        overrides: pins.clone(),
        randomization_level: level,
    }
}

fn print_outcome(outcome: &GenerationOutcome) {
    let bp = &outcome.blueprint;
    println!(
        "\n--- Blueprint {} (#{}, level {:.2}) ---",
        bp.variant_id, bp.sequence, bp.randomization_level
    );
    println!("Theme: {}", bp.theme);
    for choice in &bp.choices {
        println!("  {:<22} {} [{:?}]", choice.category, choice.option, choice.source);
    }
    if let Some(pacing) = bp.attribute("structure", "pacing") {
        println!("Pacing: {}", pacing);
    }
    println!("Innovation: {}", bp.innovation_factors.join(", "));
    println!("Diversity score: {:.3}", outcome.report.score);
    for r in &outcome.report.recommendations {
        println!("  ! {}", r);
    }
    println!("--- End ---\n");
}

fn run_bulk(
    engine: &BlueprintEngine,
    count: usize,
    pins: &BTreeMap<String, String>,
    level: Option<f64>,
) {
    let mut outcomes = Vec::with_capacity(count);
    let mut errors = 0;
    for i in 0..count {
        let request = build_request(&format!("bulk {}", i + 1), pins, level);
        match engine.request_blueprint(&request) {
            Ok(outcome) => outcomes.push(outcome),
            Err(_) => errors += 1,
        }
    }

    println!(
        "\n=== Bulk Generation: {} blueprints ({} errors) ===\n",
        outcomes.len(),
        errors
    );

    // Distinct combinations of core choices
    let combos: FxHashSet<Vec<&str>> = outcomes
        .iter()
        .map(|o| {
            o.blueprint
                .choices
                .iter()
                .filter(|c| {
                    engine
                        .catalog()
                        .category(&c.category)
                        .is_some_and(|cat| !cat.is_innovation())
                })
                .map(|c| c.option.as_str())
                .collect()
        })
        .collect();
    println!("Distinct core combinations: {} / {}", combos.len(), outcomes.len());

    let mean_score = if outcomes.is_empty() {
        0.0
    } else {
        outcomes.iter().map(|o| o.report.score).sum::<f64>() / outcomes.len() as f64
    };
    println!("Mean diversity score: {:.3}", mean_score);

    let fallbacks = outcomes
        .iter()
        .flat_map(|o| &o.blueprint.choices)
        .filter(|c| c.source == ChoiceSource::Fallback)
        .count();
    println!("Fallback selections: {}", fallbacks);
    println!("Randomization level now: {:.2}", engine.randomization_level());

    if let Some(last) = outcomes.last() {
        println!("\nLast blueprint:");
        print_outcome(last);
    }
    println!();
}
