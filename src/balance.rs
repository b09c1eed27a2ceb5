//! Covariate balance between two groups of one attribute.
//!
//! A pairwise comparison is only trustworthy if the two groups look alike on
//! everything except the tested metric. The checker compares a configurable
//! set of numeric and categorical covariates and reports the ones with
//! enough data; covariates below the minimum-size policy are omitted, not
//! errored, so one thin covariate never sinks the whole report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Enriched;
use crate::error::{EngineError, Result};
use crate::stats;

/// A numeric covariate must have more than this many observations on each
/// side to be reported at all.
pub const MIN_COVARIATE_OBSERVATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericBalance {
    pub mean_a: f64,
    pub mean_b: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalBalance {
    pub chi2: f64,
    pub p_value: f64,
}

/// Per-covariate comparison between the two groups, keyed by covariate name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub numeric: BTreeMap<String, NumericBalance>,
    pub categorical: BTreeMap<String, CategoricalBalance>,
}

pub struct BalanceChecker<'a> {
    data: &'a Enriched,
    numeric_covariates: Vec<String>,
    categorical_covariates: Vec<String>,
}

impl<'a> BalanceChecker<'a> {
    pub fn new(
        data: &'a Enriched,
        numeric_covariates: Vec<String>,
        categorical_covariates: Vec<String>,
    ) -> Self {
        BalanceChecker { data, numeric_covariates, categorical_covariates }
    }

    /// Compare the configured covariates between groups `a` and `b` of
    /// `attribute`. Fails only when the two labels select zero rows combined
    /// or the attribute column itself is missing.
    pub fn check(&self, attribute: &str, a: &str, b: &str) -> Result<BalanceReport> {
        let labels = self.data.dataset().categorical(attribute)?;

        // Row membership per side; rows outside both groups are ignored.
        let membership: Vec<Option<bool>> = labels
            .iter()
            .map(|label| match label {
                Some(l) if l.as_str() == a => Some(true),
                Some(l) if l.as_str() == b => Some(false),
                _ => None,
            })
            .collect();

        if membership.iter().all(Option::is_none) {
            return Err(EngineError::insufficient(
                format!("balance between {attribute}={a} and {attribute}={b}"),
                "the two group labels select zero rows",
            ));
        }

        let mut report = BalanceReport::default();

        for covariate in &self.numeric_covariates {
            // Missing covariate columns are omitted, same as thin ones.
            let Ok(values) = self.data.dataset().numeric(covariate) else { continue };
            let side = |want_a: bool| -> Vec<f64> {
                membership
                    .iter()
                    .zip(values)
                    .filter_map(|(m, v)| match (m, v) {
                        (Some(is_a), Some(v)) if *is_a == want_a => Some(*v),
                        _ => None,
                    })
                    .collect()
            };
            let (x, y) = (side(true), side(false));
            if x.len() <= MIN_COVARIATE_OBSERVATIONS || y.len() <= MIN_COVARIATE_OBSERVATIONS {
                continue;
            }
            if let Ok(t) = stats::welch_t(&x, &y, covariate) {
                report.numeric.insert(
                    covariate.clone(),
                    NumericBalance { mean_a: t.mean_a, mean_b: t.mean_b, t_stat: t.t, p_value: t.p },
                );
            }
        }

        for covariate in &self.categorical_covariates {
            let Ok(values) = self.data.dataset().categorical(covariate) else { continue };
            // Covariate-value × {A, B} membership counts.
            let mut counts: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
            for (m, value) in membership.iter().zip(values) {
                if let (Some(is_a), Some(value)) = (m, value) {
                    counts.entry(value.as_str()).or_insert([0, 0])[usize::from(!is_a)] += 1;
                }
            }
            let table: Vec<Vec<u64>> = counts.values().map(|c| c.to_vec()).collect();
            if let Ok(test) = stats::chi2_independence(&table, covariate) {
                report
                    .categorical
                    .insert(covariate.clone(), CategoricalBalance { chi2: test.chi2, p_value: test.p });
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{columns, derive, Dataset};

    fn covariate_book() -> Enriched {
        let n = 16;
        let mut genders = Vec::with_capacity(n);
        let mut sums = Vec::with_capacity(n);
        let mut covers = Vec::with_capacity(n);
        for i in 0..n {
            let female = i % 2 == 0;
            genders.push(Some(if female { "F" } else { "M" }.to_string()));
            sums.push(Some(if female { 5_000.0 + i as f64 } else { 9_000.0 + i as f64 }));
            covers.push(Some(if i % 4 < 2 { "Comprehensive" } else { "ThirdParty" }.to_string()));
        }
        let ds = Dataset::new(n)
            .with_categorical(columns::GENDER, genders)
            .unwrap()
            .with_numeric(columns::SUM_INSURED, sums)
            .unwrap()
            .with_categorical(columns::COVER_CATEGORY, covers)
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, vec![Some(100.0); n])
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, vec![Some(0.0); n])
            .unwrap();
        derive(ds).expect("derive")
    }

    fn checker(data: &Enriched) -> BalanceChecker<'_> {
        BalanceChecker::new(
            data,
            vec![columns::SUM_INSURED.to_string(), columns::CUSTOM_VALUE_ESTIMATE.to_string()],
            vec![columns::COVER_CATEGORY.to_string(), columns::BODY_TYPE.to_string()],
        )
    }

    #[test]
    fn reports_covariates_with_enough_data() {
        let data = covariate_book();
        let report = checker(&data).check(columns::GENDER, "F", "M").expect("balance");

        let sum_insured = report.numeric.get(columns::SUM_INSURED).expect("SumInsured reported");
        assert!(sum_insured.mean_a < sum_insured.mean_b);
        assert!(sum_insured.p_value < 0.05, "clearly separated means must flag imbalance");

        assert!(report.categorical.contains_key(columns::COVER_CATEGORY));
        // Missing covariate columns are silently absent, not errors.
        assert!(!report.numeric.contains_key(columns::CUSTOM_VALUE_ESTIMATE));
        assert!(!report.categorical.contains_key(columns::BODY_TYPE));
    }

    #[test]
    fn thin_numeric_covariate_is_omitted() {
        // Only 5 observations per side: at the threshold, not above it.
        let n = 10;
        let genders: Vec<Option<String>> =
            (0..n).map(|i| Some(if i % 2 == 0 { "F" } else { "M" }.to_string())).collect();
        let ds = Dataset::new(n)
            .with_categorical(columns::GENDER, genders)
            .unwrap()
            .with_numeric(
                columns::SUM_INSURED,
                (0..n).map(|i| Some(1_000.0 + i as f64)).collect(),
            )
            .unwrap()
            .with_numeric(columns::TOTAL_PREMIUM, vec![Some(100.0); n])
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, vec![Some(0.0); n])
            .unwrap();
        let data = derive(ds).expect("derive");
        let report = checker(&data).check(columns::GENDER, "F", "M").expect("balance");
        assert!(report.numeric.is_empty());
    }

    #[test]
    fn zero_selected_rows_is_a_hard_error() {
        let data = covariate_book();
        let err = checker(&data).check(columns::GENDER, "X", "Y").unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn missing_attribute_column_is_schema_error() {
        let data = covariate_book();
        let err = checker(&data).check(columns::PROVINCE, "A", "B").unwrap_err();
        assert!(matches!(err, EngineError::Schema { .. }));
    }
}
