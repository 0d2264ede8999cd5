//! Choosing the number of features drawn per split (mtry) by cross-validation.

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rebalance_data::LabeledTable;
use rebalance_rf::RfError;
use serde::Serialize;
use tracing::{info, instrument};

use crate::EvalError;
use crate::crossval::{CrossValidation, CrossValidationResult};
use crate::evaluator::Evaluator;
use crate::trainer::Trainer;

/// Which mtry values to try.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MtrySearch {
    /// Every value in `1..=n_features`.
    #[default]
    FullGrid,
    /// An explicit list of values.
    Grid(Vec<usize>),
    /// `n_candidates` distinct values drawn uniformly from `1..=n_features`.
    Random {
        /// How many values to draw; capped at `n_features`.
        n_candidates: usize,
    },
}

impl MtrySearch {
    /// Resolve the candidate list, sorted ascending without duplicates.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptySearch`] | no candidate to try |
    /// | [`EvalError::Model`] | a grid value is 0 or above `n_features` |
    pub fn candidates(&self, n_features: usize, seed: u64) -> Result<Vec<usize>, EvalError> {
        let mut out = match self {
            MtrySearch::FullGrid => (1..=n_features).collect(),
            MtrySearch::Grid(values) => {
                if let Some(&bad) = values.iter().find(|&&m| m == 0 || m > n_features) {
                    return Err(RfError::InvalidMaxFeatures {
                        max_features: bad,
                        n_features,
                    }
                    .into());
                }
                values.clone()
            }
            MtrySearch::Random { n_candidates } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let amount = (*n_candidates).min(n_features);
                index::sample(&mut rng, n_features, amount)
                    .iter()
                    .map(|i| i + 1)
                    .collect()
            }
        };
        out.sort_unstable();
        out.dedup();
        if out.is_empty() {
            return Err(EvalError::EmptySearch { n_candidates: 0 });
        }
        Ok(out)
    }
}

/// Cross-validated accuracy of one mtry value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    /// The mtry value.
    pub mtry: usize,
    /// Pooled out-of-fold accuracy.
    pub accuracy: f64,
}

/// The selected mtry and how every candidate scored.
#[derive(Debug, Clone)]
pub struct TuningOutcome {
    /// Winning mtry (highest pooled accuracy, smallest on ties).
    pub best_mtry: usize,
    /// Cross-validation result of the winner.
    pub best: CrossValidationResult,
    /// Every candidate in ascending mtry order.
    pub scores: Vec<CandidateScore>,
}

/// Cross-validate `trainer` at every candidate mtry on one fold assignment.
///
/// # Errors
///
/// Propagates candidate resolution, fold assignment, and training errors.
/// Any candidate failing fails the search.
#[instrument(skip_all, fields(n_records = table.n_records(), seed = seed))]
pub fn tune_mtry(
    search: &MtrySearch,
    trainer: &Trainer,
    table: &LabeledTable,
    cv: &CrossValidation,
    evaluator: &Evaluator,
    seed: u64,
) -> Result<TuningOutcome, EvalError> {
    let candidates = search.candidates(table.n_features(), seed)?;
    let folds = cv.assign(table)?;

    let mut scores = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, CrossValidationResult)> = None;

    for &mtry in &candidates {
        let result = cv.evaluate_on(&trainer.clone().with_mtry(mtry), table, &folds, evaluator)?;
        let accuracy = result.pooled.accuracy();
        info!(mtry, accuracy, "mtry candidate scored");
        scores.push(CandidateScore { mtry, accuracy });

        let better = best
            .as_ref()
            .is_none_or(|(_, b)| accuracy > b.pooled.accuracy());
        if better {
            best = Some((mtry, result));
        }
    }

    let (best_mtry, best) = best.ok_or(EvalError::EmptySearch {
        n_candidates: candidates.len(),
    })?;
    info!(best_mtry, accuracy = best.pooled.accuracy(), "mtry selected");

    Ok(TuningOutcome {
        best_mtry,
        best,
        scores,
    })
}
