//! Manuscript core CLI (for testing purposes only)
//! The main interface is through WASM bindings.
//!
//! Usage: manuscript-core <text-file> <suggestions.json>

use manuscript_core::{EngineConfig, Strategy, SuggestionEditor};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env("MANUSCRIPT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(text_path: &str, suggestions_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(text_path)?;
    let body = std::fs::read_to_string(suggestions_path)?;

    let mut editor = SuggestionEditor::with_text(&text, EngineConfig::default());
    let report = editor.ingest_json(&body, None)?;
    println!("Ingested:   {} accepted, {} rejected", report.accepted.len(), report.rejected.len());
    for rejection in &report.rejected {
        println!("  record {} rejected: {:?}", rejection.index, rejection.reason);
    }

    let conflicts = editor.manager.conflict_report();
    println!(
        "Conflicts:  {} groups, {} suggestions, max severity {:.1}",
        conflicts.groups, conflicts.conflicted, conflicts.max_severity
    );

    let resolution = editor.manager.resolve_conflicts(Strategy::Priority, true);
    println!(
        "Resolved:   {} kept, {} merged, {} invalidated, {} need a decision",
        resolution.resolved.len(),
        resolution.merged.len(),
        resolution.invalidated.len(),
        resolution.user_choice_required.len()
    );

    println!();
    for suggestion in editor.manager.actionable() {
        println!(
            "  #{:<4} {:<13} {:>6}..{:<6} {:?} -> {:?}",
            suggestion.id.0,
            suggestion.edit_type.as_str(),
            suggestion.char_start,
            suggestion.char_end,
            suggestion.original,
            suggestion.replacement
        );
    }
    println!();
    println!("Decorations: {}", editor.decorations().len());
    Ok(())
}

fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Manuscript Suggestion Engine Core");
        eprintln!("=================================");
        eprintln!();
        let program = args.first().map(String::as_str).unwrap_or("manuscript-core");
        eprintln!("usage: {program} <text-file> <suggestions.json>");
        eprintln!();
        eprintln!("This is primarily a library crate. To use it:");
        eprintln!("  Build WASM: wasm-pack build --target web");
        std::process::exit(2);
    }

    if let Err(err) = run(&args[1], &args[2]) {
        tracing::error!(%err, "failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
