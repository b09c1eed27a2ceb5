//! Markdown report generator for risklab battery output.
//!
//! Reads `results.ndjson` (or the first positional argument), re-derives the
//! accept/reject decision for every completed outcome at the canonical alpha,
//! and prints a report to stdout:
//!   - one table row per hypothesis (test used, p-value, decision, reading)
//!   - a recommendations section collecting the actions behind each rejection

use std::{
    fs::File,
    io::{BufRead, BufReader},
};

use risklab::{
    battery::BatteryRecord,
    config::AnalysisConfig,
    interpret::interpret,
    result::Outcome,
};

fn main() {
    let results_path = std::env::args().nth(1).unwrap_or_else(|| "results.ndjson".to_string());

    let file = File::open(&results_path).unwrap_or_else(|e| {
        eprintln!("error: cannot open {results_path} — {e}");
        eprintln!("Run `cargo run --release` first to generate battery output.");
        std::process::exit(1);
    });

    let mut records: Vec<BatteryRecord> = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.unwrap_or_else(|e| {
            eprintln!("error reading line {}: {}", line_no + 1, e);
            std::process::exit(1);
        });
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<BatteryRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                eprintln!("error: failed to deserialize line {}: {}", line_no + 1, e);
                eprintln!("  line: {line}");
                std::process::exit(1);
            }
        }
    }

    let alpha = AnalysisConfig::canonical().alpha;

    println!("# Risk segmentation report");
    println!();
    println!("{} hypotheses, significance level {alpha}.", records.len());
    println!();
    println!("| Hypothesis | Test used | p-value | Decision | Interpretation |");
    println!("|---|---|---|---|---|");

    let mut recommendations: Vec<String> = Vec::new();
    for record in &records {
        match &record.outcome {
            Outcome::Completed(result) => {
                let decision = interpret(&record.name, result, alpha).unwrap_or_else(|e| {
                    eprintln!("error: result for {} not interpretable — {e}", record.name);
                    std::process::exit(1);
                });
                println!(
                    "| {} | {} | {} | {} | {} |",
                    record.name,
                    result.kind.label(),
                    format_p(decision.p_value),
                    if decision.reject_null { "reject H0" } else { "retain H0" },
                    decision.statement,
                );
                if decision.reject_null && !recommendations.contains(&decision.statement) {
                    recommendations.push(decision.statement);
                }
            }
            Outcome::Skipped { reason } => {
                println!("| {} | — | — | not evaluable | {reason} |", record.name);
            }
        }
    }

    println!();
    println!("## Recommendations");
    println!();
    if recommendations.is_empty() {
        println!("Current segmentation shows no significant risk differences.");
        println!("Uniform pricing across these attributes is statistically defensible.");
    } else {
        for statement in &recommendations {
            println!("- {statement}");
        }
    }
}

/// Small p-values in scientific notation, the rest to four decimals.
fn format_p(p: f64) -> String {
    if p < 1e-4 { format!("{p:.4e}") } else { format!("{p:.4}") }
}
