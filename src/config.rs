use crate::battery::{Hypothesis, NamedHypothesis};
use crate::dataset::{columns, Enriched, Metric};
use crate::interpret::DEFAULT_ALPHA;

/// Per-run analysis settings: significance threshold and the covariates the
/// balance checker compares.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub alpha: f64,
    pub numeric_covariates: Vec<String>,
    pub categorical_covariates: Vec<String>,
}

impl AnalysisConfig {
    /// The default deployment: 5% significance, vehicle-value and cover
    /// covariates for balance checks.
    pub fn canonical() -> Self {
        AnalysisConfig {
            alpha: DEFAULT_ALPHA,
            numeric_covariates: vec![
                columns::CUSTOM_VALUE_ESTIMATE.to_string(),
                columns::SUM_INSURED.to_string(),
                columns::TOTAL_PREMIUM.to_string(),
            ],
            categorical_covariates: vec![
                columns::COVER_CATEGORY.to_string(),
                columns::BODY_TYPE.to_string(),
                columns::LEGAL_TYPE.to_string(),
            ],
        }
    }
}

/// The canonical hypothesis battery over one book:
///
/// - H0-1 provinces: claim frequency and severity are uniform.
/// - H0-2 postal areas: claim frequency and severity are uniform.
/// - H0-3 postal areas: underwriting margin is uniform.
/// - H0-4 gender: claim severity is equal between F and M (Welch).
///
/// The postal attribute resolves to whichever of `PostalCode`/`ZipCode` the
/// book carries (defaulting to `PostalCode` so an absent column surfaces as
/// a skipped hypothesis, not a silent drop). Gender frequency parity is a
/// deployment choice and is deliberately not part of the default battery.
pub fn canonical_battery(data: &Enriched) -> Vec<NamedHypothesis> {
    let postal = data.postal_attribute().unwrap_or(columns::POSTAL_CODE);
    vec![
        NamedHypothesis::new(
            "province_freq",
            Hypothesis::Frequency { attribute: columns::PROVINCE.to_string() },
        ),
        NamedHypothesis::new(
            "province_severity",
            Hypothesis::Severity { attribute: columns::PROVINCE.to_string() },
        ),
        NamedHypothesis::new(
            "zip_freq",
            Hypothesis::Frequency { attribute: postal.to_string() },
        ),
        NamedHypothesis::new(
            "zip_severity",
            Hypothesis::Severity { attribute: postal.to_string() },
        ),
        NamedHypothesis::new(
            "zip_margin",
            Hypothesis::Margin { attribute: postal.to_string() },
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
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{derive, Dataset};

    #[test]
    fn canonical_battery_resolves_postal_attribute() {
        let base = Dataset::new(1)
            .with_numeric(columns::TOTAL_PREMIUM, vec![Some(100.0)])
            .unwrap()
            .with_numeric(columns::TOTAL_CLAIMS, vec![Some(0.0)])
            .unwrap();

        let zip_book = base
            .clone()
            .with_categorical(columns::ZIP_CODE, vec![Some("0002".to_string())])
            .unwrap();
        let battery = canonical_battery(&derive(zip_book).unwrap());
        let zip_freq = battery.iter().find(|h| h.name == "zip_freq").unwrap();
        assert!(matches!(
            &zip_freq.hypothesis,
            Hypothesis::Frequency { attribute } if attribute == columns::ZIP_CODE
        ));

        // No postal column at all: keep the hypothesis so it skips loudly.
        let battery = canonical_battery(&derive(base).unwrap());
        let zip_freq = battery.iter().find(|h| h.name == "zip_freq").unwrap();
        assert!(matches!(
            &zip_freq.hypothesis,
            Hypothesis::Frequency { attribute } if attribute == columns::POSTAL_CODE
        ));
        assert_eq!(battery.len(), 6);
        assert!(!battery.iter().any(|h| h.name == "gender_freq"));
    }

    #[test]
    fn canonical_config_defaults() {
        let config = AnalysisConfig::canonical();
        assert_eq!(config.alpha, DEFAULT_ALPHA);
        assert_eq!(config.numeric_covariates.len(), 3);
        assert_eq!(config.categorical_covariates.len(), 3);
    }
}
