use rebalance_data::DataError;
use rebalance_rf::RfError;

/// Errors from training, evaluating, or comparing models.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A partitioning, fold, or resampling precondition failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Tree or forest training, prediction, or scoring failed.
    #[error(transparent)]
    Model(#[from] RfError),

    /// Returned when a balanced bootstrap is requested for a single tree.
    #[error("balanced bootstrap sampling is a forest policy and cannot train a single tree")]
    BalancedBootstrapNeedsForest,

    /// Returned when the test table's schema differs from the training table's.
    #[error("model was trained on {expected} features but the test table has {got}")]
    SchemaMismatch {
        /// Feature count seen during training.
        expected: usize,
        /// Feature count of the test table.
        got: usize,
    },

    /// Returned when an mtry search has no usable candidate.
    #[error("mtry search needs at least one candidate, got {n_candidates}")]
    EmptySearch {
        /// Number of candidates requested.
        n_candidates: usize,
    },

    /// Returned when the evaluator is handed no records.
    #[error("cannot evaluate on an empty table")]
    EmptyEvaluation,

    /// Returned when a model predicts a class index with no label.
    #[error("model predicted class {class}, which maps to no label")]
    UnknownClass {
        /// The predicted class index.
        class: usize,
    },
}
