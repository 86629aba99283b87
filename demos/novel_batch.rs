/// Novel batch example: plans a season of serial novels across themes.
///
/// Four writer threads share one engine. Each requests blueprints for its
/// themes and hands them to a toy outline writer. Telemetry collected by a
/// channel observer is summarized at the end.
///
/// Run with: cargo run --example novel_batch

use blueprint_engine::core::config::RandomizationPreset;
use blueprint_engine::core::observer::ChannelObserver;
use blueprint_engine::core::pipeline::{
    BlueprintEngine, BlueprintRequest, ContentGenerator, GenerationRequest,
};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Turns a blueprint into a three-line outline. Stands in for the
/// language-model call a real deployment would make.
struct OutlineWriter;

impl ContentGenerator for OutlineWriter {
    type Output = String;
    type Error = std::fmt::Error;

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, std::fmt::Error> {
        let bp = request.blueprint;
        let get = |category: &str| bp.option_for(category).unwrap_or("?").replace('_', " ");

        let mut out = String::new();
        writeln!(
            out,
            "[{}] \"{}\": a {} story in a {} world",
            bp.variant_id,
            request.theme,
            get("structure"),
            get("world_flavor")
        )?;
        writeln!(
            out,
            "    lead: {} ({}), driven by {}; tone {}, pacing {}",
            get("archetype"),
            bp.attribute("archetype", "motivation").unwrap_or("unknown"),
            get("conflict"),
            get("tone"),
            bp.attribute("structure", "pacing").unwrap_or("even")
        )?;
        write!(out, "    twists: {}", bp.innovation_factors.join(", ").replace('_', " "))?;
        if !request.recommendations.is_empty() {
            write!(out, "\n    (editor: {})", request.recommendations.join("; "))?;
        }
        Ok(out)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (observer, telemetry) = ChannelObserver::bounded(64);
    let engine = BlueprintEngine::builder()
        .seed(2026)
        .observer(Arc::new(observer))
        .build()
        .expect("Failed to build engine");

    let writers: [(&str, &[&str], RandomizationPreset); 4] = [
        ("serial", &["sword and sorcery", "rising sect", "heavenly tribulation"], RandomizationPreset::Standard),
        ("anthology", &["lost colony", "memory thief", "last archive"], RandomizationPreset::Epic),
        ("pilot", &["city of clocks", "broken oath"], RandomizationPreset::QuickTest),
        ("lab", &["dream economy", "causal storm", "the quiet gods"], RandomizationPreset::Experimental),
    ];

    println!("=== Novel Batch ===\n");

    std::thread::scope(|scope| {
        let engine = &engine;
        let handles: Vec<_> = writers
            .iter()
            .map(|(name, themes, preset)| {
                scope.spawn(move || {
                    let mut outlines = Vec::new();
                    for theme in themes.iter() {
                        let request = BlueprintRequest::new(theme).with_preset(*preset);
                        match engine.generate_with(&request, &OutlineWriter) {
                            Ok((_, outline)) => outlines.push(outline),
                            Err(e) => eprintln!("{}: {}", name, e),
                        }
                    }
                    (*name, outlines)
                })
            })
            .collect();

        for handle in handles {
            let (name, outlines) = handle.join().expect("writer thread panicked");
            println!("--- {} ---", name);
            for outline in outlines {
                println!("{}", outline);
            }
            println!();
        }
    });

    let events: Vec<_> = telemetry.try_iter().collect();
    let low = events.iter().filter(|e| e.score < 0.6).count();
    println!(
        "Telemetry: {} generations observed, {} below 0.6 diversity",
        events.len(),
        low
    );

    let analysis = engine.analyze(20);
    println!(
        "\nHistory: {} records, entropy score {:.3}, level now {:.2}",
        engine.history_len(),
        analysis.score,
        engine.randomization_level()
    );
    for r in &analysis.recommendations {
        println!("  - {}", r);
    }
}
