use thiserror::Error;

/// Failure taxonomy for the testing engine.
///
/// The split that matters downstream is data quality vs contract: data-quality
/// errors describe a dataset that cannot support a particular test and are
/// recorded per-hypothesis; `MissingStatistic` means an upstream component
/// produced an incomplete result and must propagate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// A column the operation needs is not present in the dataset.
    #[error("required column `{column}` is missing")]
    Schema { column: String },

    /// A column was supplied with the wrong number of rows.
    #[error("column `{column}` has {actual} values but the dataset has {expected} rows")]
    LengthMismatch { column: String, expected: usize, actual: usize },

    /// A group, pair, or covariate has too few usable observations for the
    /// selected test.
    #[error("insufficient data for {context}: {detail}")]
    InsufficientData { context: String, detail: String },

    /// A contingency table collapsed to fewer than two non-empty categories.
    #[error("degenerate contingency table for `{attribute}`: {detail}")]
    DegenerateTable { attribute: String, detail: String },

    /// Interpretation was requested on a result with no p-value. This is a
    /// broken invariant between components, not a property of the data.
    #[error("test `{test}` carries no p-value; upstream produced an incomplete result")]
    MissingStatistic { test: String },
}

impl EngineError {
    pub fn schema(column: impl Into<String>) -> Self {
        EngineError::Schema { column: column.into() }
    }

    pub fn insufficient(context: impl Into<String>, detail: impl Into<String>) -> Self {
        EngineError::InsufficientData { context: context.into(), detail: detail.into() }
    }

    pub fn degenerate(attribute: impl Into<String>, detail: impl Into<String>) -> Self {
        EngineError::DegenerateTable { attribute: attribute.into(), detail: detail.into() }
    }

    /// Whether the battery may record this error as a skipped hypothesis
    /// rather than aborting the run.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            EngineError::Schema { .. }
                | EngineError::LengthMismatch { .. }
                | EngineError::InsufficientData { .. }
                | EngineError::DegenerateTable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
