//! Training, evaluation, and comparison of class-rebalancing strategies.
//!
//! [`run_comparison`] partitions one dataset, then runs six independent
//! branches (no rebalancing, k-fold cross-validation with an mtry search,
//! down-sampling, up-sampling, SMOTE, and a balanced-bootstrap forest) and
//! collects their accuracy, sensitivity, and specificity into a
//! [`ComparisonTable`]. A failing branch becomes a failed row; only a failed
//! partition aborts the comparison.

mod compare;
mod crossval;
mod error;
mod evaluator;
mod experiment;
mod trainer;
mod tuning;

pub use compare::{BranchOutcome, ComparisonTable, FoldSummary, MetricRow};
pub use crossval::{CrossValidation, CrossValidationResult};
pub use error::EvalError;
pub use evaluator::{DegenerateMetric, Evaluation, Evaluator};
pub use experiment::{
    BranchSeeds, ExperimentConfig, ExperimentOutcome, Method, Protocol, run_comparison,
};
pub use trainer::{FittedModel, Hyperparameters, ModelKind, Trainer};
pub use tuning::{CandidateScore, MtrySearch, TuningOutcome, tune_mtry};
