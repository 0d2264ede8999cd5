use crate::domain::Label;

/// Errors from table construction, partitioning, and resampling.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when an operation receives a table with zero records.
    #[error("dataset has zero records")]
    EmptyDataset,

    /// Returned when the number of rows and labels differ.
    #[error("table has {rows} rows but {labels} labels")]
    LengthMismatch {
        /// Number of feature rows.
        rows: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Returned when a row has a different width than the schema.
    #[error("row {row_index} has {got} values, schema has {expected} columns")]
    RowWidthMismatch {
        /// Zero-based index of the offending row.
        row_index: usize,
        /// Number of schema columns.
        expected: usize,
        /// Number of values in the row.
        got: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {row_index}, column {column_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        column_index: usize,
    },

    /// Returned when the train fraction is not strictly between 0 and 1.
    #[error("train fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTrainFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when a class is too small for the requested operation.
    #[error("class {class} has {count} records, need at least {required}")]
    InsufficientClassSize {
        /// The undersized class.
        class: Label,
        /// Records of that class.
        count: usize,
        /// Minimum number of records required.
        required: usize,
    },

    /// Returned when fewer than two folds are requested.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The rejected fold count.
        n_folds: usize,
    },

    /// Returned when a class has fewer records than folds.
    #[error("class {class} has only {count} records, need at least {n_folds} for stratified folds")]
    TooFewSamplesForFolds {
        /// The undersized class.
        class: Label,
        /// Records of that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when the SMOTE neighbour count is zero.
    #[error("SMOTE neighbour count must be at least 1, got {k}")]
    InvalidNeighborCount {
        /// The rejected neighbour count.
        k: usize,
    },

    /// Returned when the minority class cannot supply `k` neighbours per record.
    #[error("minority class has {minority} records, SMOTE with k = {k} needs more than {k}")]
    InsufficientNeighbors {
        /// Size of the minority class.
        minority: usize,
        /// Requested neighbour count.
        k: usize,
    },

    /// Returned when the SMOTE over-sampling percentage is zero.
    #[error("SMOTE over-sampling percentage must be positive, got {perc_over}")]
    InvalidOversampling {
        /// The rejected percentage.
        perc_over: u32,
    },
}
