//! Runs a named set of hypotheses over one enriched book.
//!
//! Hypotheses are mutually independent reads of the same immutable dataset,
//! so they run in parallel and merge by name. Data-quality failures are
//! recorded against the hypothesis that hit them; contract violations abort
//! the whole battery.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::{Enriched, Metric};
use crate::error::Result;
use crate::result::{Outcome, TestResult};
use crate::runner::{GroupTestRunner, PairwiseTester};

/// One testable claim about the book.
#[derive(Debug, Clone, PartialEq)]
pub enum Hypothesis {
    /// Claim frequency is independent of the attribute (all groups).
    Frequency { attribute: String },
    /// Claim severity is equal across the attribute's groups.
    Severity { attribute: String },
    /// Underwriting margin is equal across the attribute's groups.
    Margin { attribute: String },
    /// A continuous metric has equal means in two named groups.
    PairwiseWelch { attribute: String, metric: Metric, group_a: String, group_b: String },
    /// Claim incidence is equal in two named groups.
    PairwiseProportions { attribute: String, group_a: String, group_b: String },
}

/// A hypothesis plus the name its result is filed under, e.g.
/// `province_freq`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedHypothesis {
    pub name: String,
    pub hypothesis: Hypothesis,
}

impl NamedHypothesis {
    pub fn new(name: impl Into<String>, hypothesis: Hypothesis) -> Self {
        NamedHypothesis { name: name.into(), hypothesis }
    }
}

/// The ndjson line format: one hypothesis outcome per line, consumed by the
/// `report` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryRecord {
    pub name: String,
    pub outcome: Outcome,
}

fn run_one(data: &Enriched, hypothesis: &Hypothesis) -> Result<TestResult> {
    match hypothesis {
        Hypothesis::Frequency { attribute } => GroupTestRunner::new(data).frequency(attribute),
        Hypothesis::Severity { attribute } => GroupTestRunner::new(data).severity(attribute),
        Hypothesis::Margin { attribute } => GroupTestRunner::new(data).margin(attribute),
        Hypothesis::PairwiseWelch { attribute, metric, group_a, group_b } => {
            PairwiseTester::new(data).welch(attribute, metric, group_a, group_b)
        }
        Hypothesis::PairwiseProportions { attribute, group_a, group_b } => {
            PairwiseTester::new(data).proportions(attribute, group_a, group_b)
        }
    }
}

/// Run every hypothesis and merge the outcomes by name.
///
/// Data-quality errors (missing column, thin groups, degenerate table)
/// become `Outcome::Skipped` for that hypothesis only; the rest of the
/// battery still runs. Anything else propagates.
pub fn run_battery(
    data: &Enriched,
    hypotheses: &[NamedHypothesis],
) -> Result<BTreeMap<String, Outcome>> {
    hypotheses
        .par_iter()
        .map(|named| match run_one(data, &named.hypothesis) {
            Ok(result) => Ok((named.name.clone(), Outcome::Completed(result))),
            Err(e) if e.is_data_quality() => {
                Ok((named.name.clone(), Outcome::Skipped { reason: e.to_string() }))
            }
            Err(e) => Err(e),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{columns, derive, Dataset};
    use crate::result::TestKind;

    fn mixed_book() -> Enriched {
        let n = 40;
        let mut provinces = Vec::with_capacity(n);
        let mut genders = Vec::with_capacity(n);
        let mut premiums = Vec::with_capacity(n);
        let mut claims = Vec::with_capacity(n);
        for i in 0..n {
            provinces.push(Some(if i % 2 == 0 { "Gauteng" } else { "Western Cape" }.to_string()));
            genders.push(Some(if i % 2 == 0 { "F" } else { "M" }.to_string()));
            premiums.push(Some(150.0 + i as f64));
            // Every fourth policy claims; amounts differ by province parity.
            claims.push(Some(if i % 4 == 0 {
                80.0 + i as f64
            } else if i % 4 == 1 {
                120.0 + i as f64
            } else {
                0.0
            }));
        }
        let ds = Dataset::new(n)
            .with_categorical(columns::PROVINCE, provinces)
            .unwrap()
            .with_categorical(columns::GENDER, genders)
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, premiums)
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, claims)
            .unwrap();
        derive(ds).expect("derive")
    }

    #[test]
    fn battery_merges_outcomes_by_name() {
        let data = mixed_book();
        let hypotheses = vec![
            NamedHypothesis::new(
                "province_freq",
                Hypothesis::Frequency { attribute: columns::PROVINCE.to_string() },
            ),
            NamedHypothesis::new(
                "province_severity",
                Hypothesis::Severity { attribute: columns::PROVINCE.to_string() },
            ),
            NamedHypothesis::new(
                "province_margin",
                Hypothesis::Margin { attribute: columns::PROVINCE.to_string() },
            ),
            NamedHypothesis::new(
                "gender_severity",
                Hypothesis::PairwiseWelch {
                    attribute: columns::GENDER.to_string(),
                    metric: Metric::Severity,
                    group_a: "F".to_string(),
                    group_b: "M".to_string(),
                },
            ),
            NamedHypothesis::new(
                "gender_freq",
                Hypothesis::PairwiseProportions {
                    attribute: columns::GENDER.to_string(),
                    group_a: "F".to_string(),
                    group_b: "M".to_string(),
                },
            ),
        ];
        let outcomes = run_battery(&data, &hypotheses).expect("battery");

        assert_eq!(outcomes.len(), hypotheses.len());
        match outcomes.get("province_freq") {
            Some(Outcome::Completed(r)) => {
                assert_eq!(r.kind, TestKind::ChiSquareFrequency);
                assert_eq!(r.table.as_ref().unwrap().grand_total() as usize, data.len());
            }
            other => panic!("province_freq should complete, got {other:?}"),
        }
        // 10 claimants per province: below 20, so the rank-based test runs.
        match outcomes.get("province_severity") {
            Some(Outcome::Completed(r)) => assert_eq!(r.kind, TestKind::KruskalSeverity),
            other => panic!("province_severity should complete, got {other:?}"),
        }
        // 20 margins per province: at the threshold, parametric.
        match outcomes.get("province_margin") {
            Some(Outcome::Completed(r)) => assert_eq!(r.kind, TestKind::AnovaMargin),
            other => panic!("province_margin should complete, got {other:?}"),
        }
        assert!(matches!(outcomes.get("gender_severity"), Some(Outcome::Completed(_))));
        assert!(matches!(outcomes.get("gender_freq"), Some(Outcome::Completed(_))));
    }

    #[test]
    fn missing_column_skips_only_that_hypothesis() {
        let data = mixed_book();
        let hypotheses = vec![
            NamedHypothesis::new(
                "province_freq",
                Hypothesis::Frequency { attribute: columns::PROVINCE.to_string() },
            ),
            NamedHypothesis::new(
                "zip_freq",
                Hypothesis::Frequency { attribute: columns::POSTAL_CODE.to_string() },
            ),
        ];
        let outcomes = run_battery(&data, &hypotheses).expect("battery");

        assert!(matches!(outcomes.get("province_freq"), Some(Outcome::Completed(_))));
        match outcomes.get("zip_freq") {
            Some(Outcome::Skipped { reason }) => {
                assert!(reason.contains(columns::POSTAL_CODE), "reason: {reason}");
            }
            other => panic!("zip_freq should be skipped, got {other:?}"),
        }
    }
}
