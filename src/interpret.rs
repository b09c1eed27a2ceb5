//! Maps a test result to a business decision.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::result::{MetricFamily, TestResult};

pub const DEFAULT_ALPHA: f64 = 0.05;

/// The rendered verdict for one test: derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub test_name: String,
    pub p_value: f64,
    pub reject_null: bool,
    pub statement: String,
}

/// Attribute phrasing buckets for the statement table. The postal bucket
/// covers both `PostalCode` and `ZipCode` books.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    Province,
    Postal,
    Gender,
    Other,
}

fn attribute_kind(attribute: &str) -> AttributeKind {
    match attribute {
        "Province" => AttributeKind::Province,
        "PostalCode" | "ZipCode" => AttributeKind::Postal,
        "Gender" => AttributeKind::Gender,
        _ => AttributeKind::Other,
    }
}

/// One-line business statement for a rejected null, enumerated per metric
/// family and attribute bucket. A retained null always reads the same.
fn statement(result: &TestResult, reject: bool) -> String {
    if !reject {
        return "No significant differences detected.".to_string();
    }

    let attribute = result.attribute.as_str();
    match (result.kind.family(), attribute_kind(attribute)) {
        (MetricFamily::Frequency, AttributeKind::Province) => {
            "Regional claim frequency differences detected. Adjust premiums by province."
                .to_string()
        }
        (MetricFamily::Frequency, AttributeKind::Postal) => {
            "Postal-area claim frequency differences found. Consider micro-rating or fraud checks."
                .to_string()
        }
        (MetricFamily::Frequency, AttributeKind::Gender) => {
            "Gender claim frequency differences detected; use with caution due to compliance."
                .to_string()
        }
        (MetricFamily::Frequency, AttributeKind::Other) => {
            format!("Claim frequency differs across {attribute} groups.")
        }
        (MetricFamily::Severity, AttributeKind::Province) => {
            "Regional claim severity differences detected. Adjust premiums by province."
                .to_string()
        }
        (MetricFamily::Severity, AttributeKind::Postal) => {
            "Postal-area severity differences found. Consider micro-rating or fraud checks."
                .to_string()
        }
        (MetricFamily::Severity, AttributeKind::Gender) => {
            "Gender severity differences detected; use with caution due to compliance.".to_string()
        }
        (MetricFamily::Severity, AttributeKind::Other) => {
            format!("Claim severity differs across {attribute} groups.")
        }
        (MetricFamily::Margin, AttributeKind::Postal) => {
            "Postal-area margin differences found. Investigate low-margin areas for fraud or mispricing."
                .to_string()
        }
        (MetricFamily::Margin, _) => {
            format!("Underwriting margin differs across {attribute} groups. Investigate low-margin segments.")
        }
        (MetricFamily::PairwiseContinuous, _) => match &result.groups {
            Some((a, b)) => {
                format!("Mean differs between {attribute}={a} and {attribute}={b}.")
            }
            None => format!("Mean differs between the compared {attribute} groups."),
        },
    }
}

/// Turn a test result into a decision against the significance threshold.
///
/// Strictly `p < alpha` rejects. A result without a p-value is a contract
/// violation by the producing component and fails hard.
pub fn interpret(test_name: &str, result: &TestResult, alpha: f64) -> Result<Decision> {
    let p_value = result
        .p_value
        .ok_or_else(|| EngineError::MissingStatistic { test: test_name.to_string() })?;
    let reject_null = p_value < alpha;
    Ok(Decision {
        test_name: test_name.to_string(),
        p_value,
        reject_null,
        statement: statement(result, reject_null),
    })
}
