use serde::{Deserialize, Serialize};

/// Closed enumeration of the tests the engine can run. Every result carries
/// exactly one of these, so consumers switch exhaustively instead of probing
/// for optional keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    ChiSquareFrequency,
    AnovaSeverity,
    KruskalSeverity,
    AnovaMargin,
    KruskalMargin,
    WelchT,
    PooledZ,
}

/// The risk metric a test speaks about, used to pick the interpretation
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFamily {
    Frequency,
    Severity,
    Margin,
    /// Pairwise Welch comparison on a caller-chosen continuous metric.
    PairwiseContinuous,
}

impl TestKind {
    pub fn family(self) -> MetricFamily {
        match self {
            TestKind::ChiSquareFrequency | TestKind::PooledZ => MetricFamily::Frequency,
            TestKind::AnovaSeverity | TestKind::KruskalSeverity => MetricFamily::Severity,
            TestKind::AnovaMargin | TestKind::KruskalMargin => MetricFamily::Margin,
            TestKind::WelchT => MetricFamily::PairwiseContinuous,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestKind::ChiSquareFrequency => "chi2_frequency",
            TestKind::AnovaSeverity => "anova_severity",
            TestKind::KruskalSeverity => "kruskal_severity",
            TestKind::AnovaMargin => "anova_margin",
            TestKind::KruskalMargin => "kruskal_margin",
            TestKind::WelchT => "welch_t",
            TestKind::PooledZ => "pooled_z",
        }
    }
}

/// Degrees of freedom as carried by a result: a single value (chi-square,
/// Welch, Kruskal) or the between/within pair of an F-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DegreesOfFreedom {
    Single(f64),
    Ratio { between: f64, within: f64 },
}

/// Attribute-value × outcome count table backing a frequency test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `counts[i][j]` — rows follow `row_labels`, columns follow `col_labels`.
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.col_labels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Outcome of one hypothesis test. Created by exactly one test operation and
/// immutable afterwards; `p_value` is a finite float in [0, 1] or None,
/// never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub kind: TestKind,
    /// The grouping attribute tested (e.g. "Province").
    pub attribute: String,
    /// The compared pair for pairwise tests; None for multi-group tests.
    pub groups: Option<(String, String)>,
    pub statistic: f64,
    pub df: Option<DegreesOfFreedom>,
    pub p_value: Option<f64>,
    /// Frequency tests carry the table their statistic was computed from.
    pub table: Option<ContingencyTable>,
    /// Group means for pairwise Welch tests (A, B).
    pub means: Option<(f64, f64)>,
    /// Claim rates for pooled-z tests (A, B).
    pub rates: Option<(f64, f64)>,
}

impl TestResult {
    /// Bare result with only the tagged essentials; optional context fields
    /// start empty and are filled by the producing test.
    pub fn new(kind: TestKind, attribute: impl Into<String>, statistic: f64, p: f64) -> Self {
        TestResult {
            kind,
            attribute: attribute.into(),
            groups: None,
            statistic,
            df: None,
            p_value: Some(p),
            table: None,
            means: None,
            rates: None,
        }
    }
}

/// The per-hypothesis slot in a battery's output mapping: either a completed
/// result, or the reason the hypothesis was skipped (data quality only —
/// contract violations never land here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Completed(TestResult),
    Skipped { reason: String },
}
