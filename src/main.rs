use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use risklab::balance::BalanceChecker;
use risklab::battery::{run_battery, BatteryRecord};
use risklab::config::{canonical_battery, AnalysisConfig};
use risklab::dataset::{columns, derive, Dataset};
use risklab::interpret::interpret;
use risklab::result::Outcome;
use risklab::synthetic::synthetic_book;

/// Numeric columns of the pipe-separated book format; everything else is
/// read as categorical.
const NUMERIC_COLUMNS: &[&str] = &[
    columns::TOTAL_PREMIUM,
    columns::TOTAL_CLAIMS,
    columns::CLAIM_COUNT,
    columns::SUM_INSURED,
    columns::CUSTOM_VALUE_ESTIMATE,
];

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut seed: u64 = 0;
    let mut rows: usize = 10_000;
    let mut input_path: Option<String> = None;
    let mut output_path = "results.ndjson".to_string();
    let mut alpha_override: Option<f64> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed = args[i].parse().expect("--seed requires a u64");
            }
            "--rows" => {
                i += 1;
                rows = args[i].parse().expect("--rows requires a positive integer");
            }
            "--input" => {
                i += 1;
                input_path = Some(args[i].clone());
            }
            "--output" => {
                i += 1;
                output_path = args[i].clone();
            }
            "--alpha" => {
                i += 1;
                alpha_override = Some(args[i].parse().expect("--alpha requires a float"));
            }
            "--quiet" => quiet = true,
            _ => {}
        }
        i += 1;
    }

    let mut config = AnalysisConfig::canonical();
    if let Some(a) = alpha_override {
        config.alpha = a;
    }

    let dataset = match input_path {
        Some(ref path) => load_book(path),
        None => synthetic_book(seed, rows),
    };
    let n_policies = dataset.len();

    let enriched = derive(dataset).unwrap_or_else(|e| panic!("book not analysable: {e}"));
    let hypotheses = canonical_battery(&enriched);
    let outcomes =
        run_battery(&enriched, &hypotheses).unwrap_or_else(|e| panic!("battery aborted: {e}"));

    let file = File::create(&output_path).expect("failed to create output file");
    let mut writer = BufWriter::new(file);
    for (name, outcome) in &outcomes {
        let record = BatteryRecord { name: name.clone(), outcome: outcome.clone() };
        serde_json::to_writer(&mut writer, &record).expect("failed to serialize outcome");
        writeln!(writer).expect("failed to write newline");
    }

    if !quiet {
        println!("Policies analysed: {n_policies}");
        println!("Outcomes written:  {} → {output_path}", outcomes.len());
        print_decisions(&outcomes, config.alpha);
        print_balance(&enriched, &config);
    }
}

/// Read a pipe-separated book with a header row. Empty and `NA` cells are
/// nulls; ragged rows abort with the offending line number.
fn load_book(path: &str) -> Dataset {
    let file = File::open(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .unwrap_or_else(|| panic!("{path} is empty"))
        .unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
    let names: Vec<String> = header.split('|').map(|s| s.trim().to_string()).collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (line_no, line) in lines.enumerate() {
        let line = line.unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != names.len() {
            panic!(
                "{path}:{}: expected {} fields, found {}",
                line_no + 2,
                names.len(),
                fields.len()
            );
        }
        for (col, field) in cells.iter_mut().zip(&fields) {
            let value = field.trim();
            col.push(if value.is_empty() || value == "NA" {
                None
            } else {
                Some(value.to_string())
            });
        }
    }

    let n_rows = cells.first().map(Vec::len).unwrap_or(0);
    let mut dataset = Dataset::new(n_rows);
    for (name, column) in names.into_iter().zip(cells) {
        if NUMERIC_COLUMNS.contains(&name.as_str()) {
            let parsed = column
                .into_iter()
                .map(|cell| {
                    cell.map(|v| {
                        v.parse::<f64>()
                            .unwrap_or_else(|_| panic!("{path}: non-numeric value {v:?} in {name}"))
                    })
                })
                .collect();
            dataset = dataset.with_numeric(name.as_str(), parsed).expect("column length matches");
        } else {
            dataset =
                dataset.with_categorical(name.as_str(), column).expect("column length matches");
        }
    }
    dataset
}

fn print_decisions(outcomes: &std::collections::BTreeMap<String, Outcome>, alpha: f64) {
    println!("\n=== Decision table (alpha = {alpha}) ===");
    println!(
        "{:<18} | {:<16} | {:>10} | {:<8} | Interpretation",
        "Hypothesis", "Test", "p-value", "Decision"
    );
    println!("{}", "-".repeat(100));

    for (name, outcome) in outcomes {
        match outcome {
            Outcome::Completed(result) => {
                let decision = interpret(name, result, alpha)
                    .unwrap_or_else(|e| panic!("uninterpretable result for {name}: {e}"));
                println!(
                    "{:<18} | {:<16} | {:>10.4e} | {:<8} | {}",
                    name,
                    result.kind.label(),
                    decision.p_value,
                    if decision.reject_null { "REJECT" } else { "retain" },
                    decision.statement,
                );
            }
            Outcome::Skipped { reason } => {
                println!("{name:<18} | {:<16} | {:>10} | {:<8} | {reason}", "-", "-", "skipped");
            }
        }
    }
}

/// Gender is the one attribute where canonical pairwise tests run, so check
/// that its two groups are comparable on the configured covariates.
fn print_balance(enriched: &risklab::dataset::Enriched, config: &AnalysisConfig) {
    if !enriched.dataset().has_categorical(columns::GENDER) {
        return;
    }
    let checker = BalanceChecker::new(
        enriched,
        config.numeric_covariates.clone(),
        config.categorical_covariates.clone(),
    );
    let report = match checker.check(columns::GENDER, "F", "M") {
        Ok(report) => report,
        Err(e) => {
            println!("\nBalance check unavailable: {e}");
            return;
        }
    };

    println!("\n=== Covariate balance: Gender F vs M ===");
    for (covariate, numeric) in &report.numeric {
        println!(
            "  {covariate:<22} mean F {:>12.2} | mean M {:>12.2} | t {:>7.3} | p {:.4}",
            numeric.mean_a, numeric.mean_b, numeric.t_stat, numeric.p_value,
        );
    }
    for (covariate, categorical) in &report.categorical {
        println!(
            "  {covariate:<22} chi2 {:>9.3} | p {:.4}",
            categorical.chi2, categorical.p_value,
        );
    }
    let thin = config
        .numeric_covariates
        .iter()
        .chain(&config.categorical_covariates)
        .filter(|c| !report.numeric.contains_key(*c) && !report.categorical.contains_key(*c))
        .collect::<Vec<_>>();
    if !thin.is_empty() {
        println!("  (omitted for thin or missing data: {thin:?})");
    }
}
