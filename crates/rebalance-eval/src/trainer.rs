//! Fitting a tree or forest on a labeled table.

use std::fmt;

use rebalance_data::LabeledTable;
use rebalance_rf::{
    BootstrapPolicy, DecisionTree, DecisionTreeConfig, MaxFeatures, OobMode, RandomForestConfig,
    RandomForestResult, RankedFeature, RfError,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::EvalError;

/// Which classifier a [`Trainer`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// A single CART tree over all features.
    Tree,
    /// A bootstrap forest drawing `mtry` features per split.
    #[default]
    Forest,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Tree => "tree",
            ModelKind::Forest => "forest",
        })
    }
}

/// Model hyperparameters shared by every branch.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `mtry`           | 3       |
/// | `n_trees`        | 1000    |
/// | `min_node_size`  | 1       |
/// | `min_split_size` | 1       |
/// | `max_depth`      | `None`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hyperparameters {
    /// Features drawn at each forest split. Ignored by a single tree.
    pub mtry: usize,
    /// Trees per forest.
    pub n_trees: usize,
    /// Minimum samples in each leaf.
    pub min_node_size: usize,
    /// Minimum samples a node needs before a split is attempted.
    pub min_split_size: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            mtry: 3,
            n_trees: 1000,
            min_node_size: 1,
            min_split_size: 1,
            max_depth: None,
        }
    }
}

impl Hyperparameters {
    /// Return a copy with a different `mtry`.
    #[must_use]
    pub fn with_mtry(mut self, mtry: usize) -> Self {
        self.mtry = mtry;
        self
    }
}

/// Builds a [`FittedModel`] from a training table.
///
/// Construct via [`Trainer::new`], then chain `with_bootstrap` for forests.
#[derive(Debug, Clone)]
pub struct Trainer {
    kind: ModelKind,
    params: Hyperparameters,
    bootstrap: BootstrapPolicy,
}

impl Trainer {
    /// Create a trainer with the standard bootstrap.
    #[must_use]
    pub fn new(kind: ModelKind, params: Hyperparameters) -> Self {
        Self {
            kind,
            params,
            bootstrap: BootstrapPolicy::Standard,
        }
    }

    /// Set the per-tree bootstrap policy.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: BootstrapPolicy) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Return a copy with a different `mtry`.
    #[must_use]
    pub fn with_mtry(mut self, mtry: usize) -> Self {
        self.params.mtry = mtry;
        self
    }

    /// Return the model kind.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Return the hyperparameters.
    #[must_use]
    pub fn params(&self) -> Hyperparameters {
        self.params
    }

    /// Return the bootstrap policy.
    #[must_use]
    pub fn bootstrap(&self) -> BootstrapPolicy {
        self.bootstrap
    }

    /// Fit a model on `train`.
    ///
    /// Forests compute an out-of-bag error estimate alongside the fit. The
    /// estimate is `None` when no record was ever left out of bag.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::BalancedBootstrapNeedsForest`] | balanced bootstrap with [`ModelKind::Tree`] |
    /// | [`EvalError::Model`] | any [`RfError`] from training, e.g. `InvalidMaxFeatures` |
    #[instrument(skip_all, fields(kind = %self.kind, n_records = train.n_records(), seed = seed))]
    pub fn fit(&self, train: &LabeledTable, seed: u64) -> Result<FittedModel, EvalError> {
        let labels = train.class_indices();
        let p = &self.params;

        let model = match self.kind {
            ModelKind::Tree => {
                if self.bootstrap != BootstrapPolicy::Standard {
                    return Err(EvalError::BalancedBootstrapNeedsForest);
                }
                let tree = DecisionTreeConfig::new()
                    .with_max_depth(p.max_depth)
                    .with_min_samples_split(p.min_split_size)
                    .with_min_samples_leaf(p.min_node_size)
                    .with_seed(seed)
                    .fit(train.rows(), &labels)?;
                debug!(n_nodes = tree.n_nodes(), depth = tree.depth(), "tree fitted");
                FittedModel::Tree(tree)
            }
            ModelKind::Forest => {
                let result = RandomForestConfig::new(p.n_trees)?
                    .with_max_features(MaxFeatures::Fixed(p.mtry))
                    .with_max_depth(p.max_depth)
                    .with_min_samples_split(p.min_split_size)
                    .with_min_samples_leaf(p.min_node_size)
                    .with_bootstrap(self.bootstrap)
                    .with_oob_mode(OobMode::Enabled)
                    .with_seed(seed)
                    .fit(train.rows(), &labels, &train.feature_names())?;
                FittedModel::Forest(Box::new(result))
            }
        };
        Ok(model)
    }
}

/// A trained classifier.
#[derive(Debug)]
pub enum FittedModel {
    /// A single decision tree.
    Tree(DecisionTree),
    /// A forest with its out-of-bag estimate and importances.
    Forest(Box<RandomForestResult>),
}

impl FittedModel {
    /// Predict class indices for a batch of rows.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if a row has the wrong width.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        match self {
            FittedModel::Tree(tree) => tree.predict_batch(rows),
            FittedModel::Forest(result) => result.forest().predict_batch(rows),
        }
    }

    /// Number of features the model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::Tree(tree) => tree.n_features(),
            FittedModel::Forest(result) => result.forest().n_features(),
        }
    }

    /// Out-of-bag error rate, for forests.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        match self {
            FittedModel::Tree(_) => None,
            FittedModel::Forest(result) => result.oob_error(),
        }
    }

    /// Features ranked by mean decrease in Gini impurity, for forests.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        match self {
            FittedModel::Tree(_) => &[],
            FittedModel::Forest(result) => result.importances(),
        }
    }
}
