use std::collections::BTreeMap;

use crate::error::{EngineError, Result};

/// Well-known column names from the policy book schema.
pub mod columns {
    pub const TOTAL_PREMIUM: &str = "TotalPremium";
    pub const TOTAL_CLAIMS: &str = "TotalClaims";
    pub const CLAIM_COUNT: &str = "ClaimCount";
    pub const PROVINCE: &str = "Province";
    pub const POSTAL_CODE: &str = "PostalCode";
    pub const ZIP_CODE: &str = "ZipCode";
    pub const GENDER: &str = "Gender";
    pub const COVER_CATEGORY: &str = "CoverCategory";
    pub const BODY_TYPE: &str = "Bodytype";
    pub const LEGAL_TYPE: &str = "LegalType";
    pub const SUM_INSURED: &str = "SumInsured";
    pub const CUSTOM_VALUE_ESTIMATE: &str = "CustomValueEstimate";
}

/// One cleaned policy book: columnar, fixed row count, explicit nulls.
///
/// Column presence is part of the contract — an absent column surfaces as
/// `EngineError::Schema` at the accessor, never as a silently skipped test.
/// The engine never mutates a dataset after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    n_rows: usize,
    numeric: BTreeMap<String, Vec<Option<f64>>>,
    categorical: BTreeMap<String, Vec<Option<String>>>,
}

impl Dataset {
    pub fn new(n_rows: usize) -> Self {
        Dataset { n_rows, numeric: BTreeMap::new(), categorical: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn with_numeric(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(EngineError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.numeric.insert(name, values);
        Ok(self)
    }

    pub fn with_categorical(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<String>>,
    ) -> Result<Self> {
        let name = name.into();
        if values.len() != self.n_rows {
            return Err(EngineError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.categorical.insert(name, values);
        Ok(self)
    }

    pub fn has_numeric(&self, name: &str) -> bool {
        self.numeric.contains_key(name)
    }

    pub fn has_categorical(&self, name: &str) -> bool {
        self.categorical.contains_key(name)
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        self.numeric
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::schema(name))
    }

    pub fn categorical(&self, name: &str) -> Result<&[Option<String>]> {
        self.categorical
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::schema(name))
    }
}

/// A continuous metric addressable by pairwise tests and balance checks:
/// either one of the derived risk metrics or a raw numeric column.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Severity,
    Margin,
    Column(String),
}

impl Metric {
    pub fn name(&self) -> &str {
        match self {
            Metric::Severity => "AvgClaimSeverity",
            Metric::Margin => "Margin",
            Metric::Column(name) => name,
        }
    }
}

/// The policy book plus the derived per-record risk fields.
///
/// Produced once per run by [`derive`]; every test component reads from this
/// and nothing writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched {
    dataset: Dataset,
    had_claim: Vec<bool>,
    claim_count: Vec<u64>,
    severity: Vec<Option<f64>>,
    margin: Vec<f64>,
}

/// Compute the derived risk fields from the raw financial columns.
///
/// - `had_claim` — TotalClaims > 0.
/// - `claim_count` — source ClaimCount when present, else had_claim as 0/1.
/// - `severity` — TotalClaims / claim_count when claim_count > 0, else None.
///   None marks "no claim to average", never "zero severity".
/// - `margin` — TotalPremium − TotalClaims, exact.
///
/// Null financial cells are read as 0.0: the input contract is the cleaned
/// book, where financials have already been filled. Fails with a schema
/// error when TotalPremium or TotalClaims is absent.
pub fn derive(dataset: Dataset) -> Result<Enriched> {
    let premiums = dataset.numeric(columns::TOTAL_PREMIUM)?;
    let claims = dataset.numeric(columns::TOTAL_CLAIMS)?;
    let source_counts = if dataset.has_numeric(columns::CLAIM_COUNT) {
        Some(dataset.numeric(columns::CLAIM_COUNT)?)
    } else {
        None
    };

    let n = dataset.len();
    let mut had_claim = Vec::with_capacity(n);
    let mut claim_count = Vec::with_capacity(n);
    let mut severity = Vec::with_capacity(n);
    let mut margin = Vec::with_capacity(n);

    for i in 0..n {
        let premium = premiums[i].unwrap_or(0.0);
        let claim = claims[i].unwrap_or(0.0);
        let had = claim > 0.0;
        let count = match source_counts {
            Some(cc) => cc[i].map(|c| c.max(0.0) as u64).unwrap_or(u64::from(had)),
            None => u64::from(had),
        };
        had_claim.push(had);
        claim_count.push(count);
        severity.push(if count > 0 { Some(claim / count as f64) } else { None });
        margin.push(premium - claim);
    }

    Ok(Enriched { dataset, had_claim, claim_count, severity, margin })
}

impl Enriched {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn had_claim(&self) -> &[bool] {
        &self.had_claim
    }

    pub fn claim_count(&self) -> &[u64] {
        &self.claim_count
    }

    pub fn severity(&self) -> &[Option<f64>] {
        &self.severity
    }

    pub fn margin(&self) -> &[f64] {
        &self.margin
    }

    /// Per-record values of a continuous metric, nulls preserved.
    pub fn metric(&self, metric: &Metric) -> Result<Vec<Option<f64>>> {
        match metric {
            Metric::Severity => Ok(self.severity.clone()),
            Metric::Margin => Ok(self.margin.iter().map(|&m| Some(m)).collect()),
            Metric::Column(name) => Ok(self.dataset.numeric(name)?.to_vec()),
        }
    }

    /// The postal attribute this book carries: `PostalCode` when present,
    /// else `ZipCode`, else none.
    pub fn postal_attribute(&self) -> Option<&'static str> {
        if self.dataset.has_categorical(columns::POSTAL_CODE) {
            Some(columns::POSTAL_CODE)
        } else if self.dataset.has_categorical(columns::ZIP_CODE) {
            Some(columns::ZIP_CODE)
        } else {
            None
        }
    }
}
