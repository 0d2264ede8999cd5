//! The six-way comparison of rebalancing methods on one dataset.
//!
//! One stratified partition is shared by every held-out branch. The
//! cross-validated branch runs on the whole dataset and, for forests, picks
//! the mtry reused by the branches after it. A branch that fails becomes a
//! failed row; the others still run.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rebalance_data::{
    ClassCounts, DownSample, Identity, Label, LabeledTable, Resampler, Smote, Split,
    StratifiedSplit, UpSample,
};
use rebalance_rf::BootstrapPolicy;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::EvalError;
use crate::compare::{BranchOutcome, ComparisonTable, FoldSummary, MetricRow};
use crate::crossval::CrossValidation;
use crate::evaluator::Evaluator;
use crate::trainer::{Hyperparameters, ModelKind, Trainer};
use crate::tuning::{MtrySearch, tune_mtry};

/// A way of handling the class imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Train on the partition as drawn.
    Imbalanced,
    /// Stratified k-fold cross-validation on the whole dataset.
    KFold,
    /// Down-sample the majority to the minority size.
    DownSampling,
    /// Up-sample the minority to the majority size.
    UpSampling,
    /// Synthesize minority records, then shrink the majority.
    Smote,
    /// Draw the same number of records per class for every tree.
    BalancedBootstrap,
}

impl Method {
    /// Every method, in the order they are run and reported.
    pub const ALL: [Method; 6] = [
        Method::Imbalanced,
        Method::KFold,
        Method::DownSampling,
        Method::UpSampling,
        Method::Smote,
        Method::BalancedBootstrap,
    ];

    /// Display name used in the comparison table.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Method::Imbalanced => "Imbalanced",
            Method::KFold => "K-fold CV",
            Method::DownSampling => "Down-sampling",
            Method::UpSampling => "Up-sampling",
            Method::Smote => "SMOTE",
            Method::BalancedBootstrap => "Balanced bootstrap",
        }
    }

    /// How this method's metrics are obtained.
    #[must_use]
    pub fn protocol(self) -> Protocol {
        match self {
            Method::KFold => Protocol::PooledCv,
            _ => Protocol::HeldOut,
        }
    }

    fn position(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Evaluation protocol behind a row's metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Scored on the shared held-out test partition.
    HeldOut,
    /// Scored on pooled out-of-fold predictions over the whole dataset.
    PooledCv,
}

/// Seeds actually used by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchSeeds {
    /// Seed of the stratified partition.
    pub partition: u64,
    branches: [u64; 6],
}

impl BranchSeeds {
    /// Derive the partition seed and one seed per method from `master`.
    #[must_use]
    pub fn derive(master: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(master);
        let partition = rng.r#gen();
        let mut branches = [0u64; 6];
        for seed in &mut branches {
            *seed = rng.r#gen();
        }
        Self { partition, branches }
    }

    /// Seed of one branch.
    #[must_use]
    pub fn get(&self, method: Method) -> u64 {
        self.branches[method.position()]
    }

    fn set(&mut self, method: Method, seed: u64) {
        self.branches[method.position()] = seed;
    }
}

/// Configuration of a comparison run.
///
/// # Defaults
///
/// | Parameter        | Default                |
/// |------------------|------------------------|
/// | `train_fraction` | 0.67                   |
/// | `n_folds`        | 10                     |
/// | `model`          | forest                 |
/// | `params`         | [`Hyperparameters::default`] |
/// | `smote`          | `k = 8`, 200 / 200     |
/// | `search`         | full grid              |
/// | `seed`           | 42                     |
/// | `positive`       | abnormal               |
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    train_fraction: f64,
    n_folds: usize,
    model: ModelKind,
    params: Hyperparameters,
    smote: Smote,
    search: MtrySearch,
    seed: u64,
    seed_overrides: Vec<(Method, u64)>,
    positive: Label,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.67,
            n_folds: 10,
            model: ModelKind::Forest,
            params: Hyperparameters::default(),
            smote: Smote::default(),
            search: MtrySearch::FullGrid,
            seed: 42,
            seed_overrides: Vec::new(),
            positive: Label::Abnormal,
        }
    }
}

impl ExperimentConfig {
    /// Create a configuration with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fraction of each class placed in the training partition.
    #[must_use]
    pub fn with_train_fraction(mut self, train_fraction: f64) -> Self {
        self.train_fraction = train_fraction;
        self
    }

    /// Set the number of cross-validation folds.
    #[must_use]
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Set the classifier kind.
    #[must_use]
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Set the model hyperparameters.
    #[must_use]
    pub fn with_params(mut self, params: Hyperparameters) -> Self {
        self.params = params;
        self
    }

    /// Set the SMOTE resampler.
    #[must_use]
    pub fn with_smote(mut self, smote: Smote) -> Self {
        self.smote = smote;
        self
    }

    /// Set the mtry search of the cross-validated branch.
    #[must_use]
    pub fn with_search(mut self, search: MtrySearch) -> Self {
        self.search = search;
        self
    }

    /// Set the master seed every other seed is derived from.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Pin the seed of one branch instead of deriving it.
    #[must_use]
    pub fn with_branch_seed(mut self, method: Method, seed: u64) -> Self {
        self.seed_overrides.retain(|(m, _)| *m != method);
        self.seed_overrides.push((method, seed));
        self
    }

    /// Set the class treated as positive by sensitivity.
    #[must_use]
    pub fn with_positive(mut self, positive: Label) -> Self {
        self.positive = positive;
        self
    }

    /// Return the training fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Return the fold count.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the classifier kind.
    #[must_use]
    pub fn model(&self) -> ModelKind {
        self.model
    }

    /// Return the hyperparameters.
    #[must_use]
    pub fn params(&self) -> Hyperparameters {
        self.params
    }

    /// Return the SMOTE resampler.
    #[must_use]
    pub fn smote(&self) -> &Smote {
        &self.smote
    }

    /// Return the mtry search.
    #[must_use]
    pub fn search(&self) -> &MtrySearch {
        &self.search
    }

    /// Return the master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the positive class.
    #[must_use]
    pub fn positive(&self) -> Label {
        self.positive
    }

    /// Seeds for this configuration, overrides applied.
    #[must_use]
    pub fn branch_seeds(&self) -> BranchSeeds {
        let mut seeds = BranchSeeds::derive(self.seed);
        for &(method, seed) in &self.seed_overrides {
            seeds.set(method, seed);
        }
        seeds
    }

    /// Draw the stratified train/test partition every held-out branch shares.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Data`] for an invalid training fraction or a class
    /// too small to appear in both partitions.
    pub fn partition(&self, dataset: &LabeledTable) -> Result<Split, EvalError> {
        let split = StratifiedSplit::new(self.train_fraction)?
            .with_seed(self.branch_seeds().partition)
            .split(dataset)?;
        Ok(split)
    }
}

/// Everything a comparison run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentOutcome {
    /// Class distribution of the whole dataset.
    pub dataset_counts: ClassCounts,
    /// Class distribution of the training partition.
    pub train_counts: ClassCounts,
    /// Class distribution of the test partition.
    pub test_counts: ClassCounts,
    /// mtry chosen by the cross-validated branch, if it tuned one.
    pub tuned_mtry: Option<usize>,
    /// Seeds the run used.
    pub seeds: BranchSeeds,
    /// One outcome per method, in methodology order.
    pub table: ComparisonTable,
}

/// Run every method on `dataset` and collect the comparison table.
///
/// # Errors
///
/// Only partitioning errors are returned, e.g. an invalid training fraction
/// or a class too small to appear in both partitions. Every later error is
/// recorded as a failed row.
#[instrument(skip_all, fields(n_records = dataset.n_records(), model = %config.model, seed = config.seed))]
pub fn run_comparison(
    config: &ExperimentConfig,
    dataset: &LabeledTable,
) -> Result<ExperimentOutcome, EvalError> {
    let seeds = config.branch_seeds();
    let split = config.partition(dataset)?;
    info!(
        train = %split.train().class_counts(),
        test = %split.test().class_counts(),
        "dataset partitioned"
    );

    let evaluator = Evaluator::new(config.positive);
    let trainer = Trainer::new(config.model, config.params);
    let mut rows = Vec::with_capacity(Method::ALL.len());

    let imbalanced = held_out(Method::Imbalanced, &trainer, &Identity, &split, &seeds, &evaluator);
    rows.push(finish(Method::Imbalanced, imbalanced));

    let kfold = cross_validated(config, &trainer, dataset, seeds.get(Method::KFold), &evaluator);
    let tuned_mtry = match (&kfold, config.model) {
        (Ok(row), ModelKind::Forest) => row.mtry,
        _ => None,
    };
    rows.push(finish(Method::KFold, kfold));

    let mtry = tuned_mtry.unwrap_or(config.params.mtry);
    let tuned = trainer.clone().with_mtry(mtry);

    let resamplers: [(Method, &dyn Resampler); 3] = [
        (Method::DownSampling, &DownSample),
        (Method::UpSampling, &UpSample),
        (Method::Smote, &config.smote),
    ];
    for (method, resampler) in resamplers {
        let result = held_out(method, &tuned, resampler, &split, &seeds, &evaluator);
        rows.push(finish(method, result));
    }

    // Balanced bootstrap is a forest policy; it runs as a forest in tree mode too.
    let balanced = Trainer::new(ModelKind::Forest, config.params.with_mtry(mtry))
        .with_bootstrap(BootstrapPolicy::Balanced { per_class: None });
    let result = held_out(
        Method::BalancedBootstrap,
        &balanced,
        &Identity,
        &split,
        &seeds,
        &evaluator,
    );
    rows.push(finish(Method::BalancedBootstrap, result));

    let table = ComparisonTable::new(rows);
    info!(n_failed = table.n_failed(), "comparison complete");

    Ok(ExperimentOutcome {
        dataset_counts: dataset.class_counts(),
        train_counts: split.train().class_counts(),
        test_counts: split.test().class_counts(),
        tuned_mtry,
        seeds,
        table,
    })
}

fn finish(method: Method, result: Result<MetricRow, EvalError>) -> BranchOutcome {
    match result {
        Ok(row) => BranchOutcome::Completed(row),
        Err(err) => {
            warn!(%method, error = %err, "branch failed");
            BranchOutcome::Failed {
                method,
                reason: err.to_string(),
            }
        }
    }
}

/// Resample the training partition, fit, and score on the test partition.
fn held_out(
    method: Method,
    trainer: &Trainer,
    resampler: &dyn Resampler,
    split: &Split,
    seeds: &BranchSeeds,
    evaluator: &Evaluator,
) -> Result<MetricRow, EvalError> {
    info!(%method, resampler = resampler.name(), "branch started");
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.get(method));
    let resample_seed: u64 = rng.r#gen();
    let fit_seed: u64 = rng.r#gen();

    let train = resampler.resample(split.train(), resample_seed)?;
    let model = trainer.fit(&train, fit_seed)?;
    let evaluation = evaluator.evaluate(&model, split.test())?;

    let mut row = MetricRow::new(method, trainer.kind(), &evaluation, train.class_counts());
    if trainer.kind() == ModelKind::Forest {
        row.mtry = Some(trainer.params().mtry);
    }
    row.oob_error = model.oob_error();
    row.importances = model.importances().to_vec();
    Ok(row)
}

/// Cross-validate on the whole dataset, tuning mtry for forests.
fn cross_validated(
    config: &ExperimentConfig,
    trainer: &Trainer,
    dataset: &LabeledTable,
    seed: u64,
    evaluator: &Evaluator,
) -> Result<MetricRow, EvalError> {
    info!(method = %Method::KFold, n_folds = config.n_folds, "branch started");
    let cv = CrossValidation::new(config.n_folds)?.with_seed(seed);
    let counts = dataset.class_counts();

    match trainer.kind() {
        ModelKind::Forest => {
            let outcome = tune_mtry(&config.search, trainer, dataset, &cv, evaluator, seed)?;
            let mut row = MetricRow::new(Method::KFold, ModelKind::Forest, &outcome.best.pooled, counts);
            row.mtry = Some(outcome.best_mtry);
            row.folds = Some(FoldSummary::from(&outcome.best));
            row.mtry_scores = outcome.scores;
            Ok(row)
        }
        ModelKind::Tree => {
            let result = cv.evaluate(trainer, dataset, evaluator)?;
            let mut row = MetricRow::new(Method::KFold, ModelKind::Tree, &result.pooled, counts);
            row.folds = Some(FoldSummary::from(&result));
            Ok(row)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_in_methodology_order() {
        let labels: Vec<&str> = Method::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Imbalanced",
                "K-fold CV",
                "Down-sampling",
                "Up-sampling",
                "SMOTE",
                "Balanced bootstrap"
            ]
        );
        assert_eq!(Method::KFold.protocol(), Protocol::PooledCv);
        assert_eq!(Method::Smote.protocol(), Protocol::HeldOut);
    }

    #[test]
    fn seeds_derive_deterministically() {
        let a = BranchSeeds::derive(42);
        assert_eq!(a, BranchSeeds::derive(42));
        assert_ne!(a, BranchSeeds::derive(43));
        assert_ne!(a.get(Method::Imbalanced), a.get(Method::KFold));
    }

    #[test]
    fn override_pins_one_branch() {
        let base = ExperimentConfig::new().branch_seeds();
        let pinned = ExperimentConfig::new()
            .with_branch_seed(Method::Smote, 7)
            .with_branch_seed(Method::Smote, 9)
            .branch_seeds();
        assert_eq!(pinned.get(Method::Smote), 9);
        assert_eq!(pinned.get(Method::UpSampling), base.get(Method::UpSampling));
        assert_eq!(pinned.partition, base.partition);
    }

    fn table(n_normal: usize, n_abnormal: usize) -> LabeledTable {
        use rebalance_data::{Column, FeatureKind};

        let n = n_normal + n_abnormal;
        let rows = (0..n).map(|i| vec![i as f64]).collect();
        let labels = (0..n)
            .map(|i| if i < n_normal { Label::Normal } else { Label::Abnormal })
            .collect();
        LabeledTable::new(vec![Column::new("x", FeatureKind::Continuous)], rows, labels).unwrap()
    }

    #[test]
    fn partition_uses_derived_seed() {
        let data = table(44, 6);
        let config = ExperimentConfig::new().with_seed(11);
        let split = config.partition(&data).unwrap();
        let expected = StratifiedSplit::new(0.67)
            .unwrap()
            .with_seed(config.branch_seeds().partition)
            .split(&data)
            .unwrap();
        assert_eq!(split.train(), expected.train());
        assert_eq!(split.test(), expected.test());

        // Pinning a branch seed leaves the partition alone.
        let pinned = config.clone().with_branch_seed(Method::Imbalanced, 3);
        assert_eq!(pinned.partition(&data).unwrap().train(), split.train());
    }

    #[test]
    fn invalid_fraction_aborts_run() {
        let table = LabeledTable::new(Vec::new(), Vec::new(), Vec::new()).unwrap();
        let config = ExperimentConfig::new().with_train_fraction(1.5);
        assert!(run_comparison(&config, &table).is_err());
    }
}
