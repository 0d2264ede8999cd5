//! Stratified k-fold cross-validation with pooled out-of-fold predictions.

use rebalance_data::{FoldAssignment, Label, LabeledTable, StratifiedKFold};
use tracing::{debug, info, instrument};

use crate::EvalError;
use crate::evaluator::{Evaluation, Evaluator};
use crate::trainer::Trainer;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Results of stratified k-fold cross-validation.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// Metrics over every record, each predicted by the model that did not see it.
    pub pooled: Evaluation,
    /// Accuracy on each held-out fold.
    pub fold_accuracies: Vec<f64>,
    /// Mean of `fold_accuracies`.
    pub mean_accuracy: f64,
    /// Population standard deviation of `fold_accuracies`.
    pub std_accuracy: f64,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`rebalance_data::DataError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        StratifiedKFold::new(n_folds)?;
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for fold assignment and per-fold training.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Assign every record of `table` to a stratified fold.
    ///
    /// # Errors
    ///
    /// Returns [`rebalance_data::DataError::TooFewSamplesForFolds`] when a
    /// class has fewer records than folds.
    pub fn assign(&self, table: &LabeledTable) -> Result<FoldAssignment, EvalError> {
        Ok(StratifiedKFold::new(self.n_folds)?
            .with_seed(self.seed)
            .assign(table.labels())?)
    }

    /// Assign folds and cross-validate `trainer` on `table`.
    ///
    /// # Errors
    ///
    /// Propagates fold-assignment, training, and evaluation errors.
    pub fn evaluate(
        &self,
        trainer: &Trainer,
        table: &LabeledTable,
        evaluator: &Evaluator,
    ) -> Result<CrossValidationResult, EvalError> {
        let folds = self.assign(table)?;
        self.evaluate_on(trainer, table, &folds, evaluator)
    }

    /// Cross-validate `trainer` on pre-assigned folds.
    ///
    /// Fold `f` trains with seed `seed + f`, so candidates compared on the
    /// same folds also share their training randomness.
    ///
    /// # Errors
    ///
    /// Propagates training and evaluation errors from any fold.
    #[instrument(skip_all, fields(n_folds = folds.n_folds(), n_records = table.n_records()))]
    pub fn evaluate_on(
        &self,
        trainer: &Trainer,
        table: &LabeledTable,
        folds: &FoldAssignment,
        evaluator: &Evaluator,
    ) -> Result<CrossValidationResult, EvalError> {
        let n_folds = folds.n_folds();
        let mut pooled = vec![Label::Normal; table.n_records()];
        let mut fold_accuracies = Vec::with_capacity(n_folds);

        for fold in 0..n_folds {
            let test_indices = folds.test_indices(fold);
            let train = table.select(&folds.train_indices(fold));
            let test = table.select(&test_indices);

            let model = trainer.fit(&train, self.seed.wrapping_add(fold as u64))?;
            let evaluation = evaluator.evaluate(&model, &test)?;

            for (&i, &label) in test_indices.iter().zip(evaluation.predictions()) {
                pooled[i] = label;
            }
            fold_accuracies.push(evaluation.accuracy());
            debug!(fold, accuracy = evaluation.accuracy(), "fold completed");
        }

        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n_folds as f64;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / n_folds as f64;
            variance.sqrt()
        };

        let pooled = evaluator.from_predictions(table.labels(), &pooled)?;

        info!(
            pooled_accuracy = pooled.accuracy(),
            mean_accuracy,
            std_accuracy,
            "cross-validation complete"
        );

        Ok(CrossValidationResult {
            pooled,
            fold_accuracies,
            mean_accuracy,
            std_accuracy,
        })
    }
}
