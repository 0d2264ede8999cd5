use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Node, NodeIndex, majority_class},
    split::{SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 1                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
///
/// A node is split only when it holds at least `max(min_samples_split, 2)`
/// samples, is impure, and some threshold lowers the weighted impurity.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 1,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features drawn at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`, `labels[sample_idx]` zero-based.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                              |
    /// |-------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                               |
    /// | [`RfError::LabelCountMismatch`]     | `features` and `labels` differ in length          |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                    |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                      |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` is outside [1, n_features]         |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` is zero                       |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` is zero                        |
    /// | [`RfError::TooFewSamples`]          | fewer samples than `min_samples_split`            |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let n_features = validate_dataset(features, labels)?;
        self.validate(features.len())?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let n_classes = n_classes_of(labels);
        let col_features = to_column_major(features, n_features);
        let sample_indices: Vec<usize> = (0..features.len()).collect();

        Ok(self.grow(&col_features, labels, &sample_indices, n_classes, max_features))
    }

    /// Check hyperparameters against the training set size.
    pub(crate) fn validate(&self, n_samples: usize) -> Result<(), RfError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split == 0 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: 0,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: 0,
            });
        }
        if n_samples < self.min_samples_split {
            return Err(RfError::TooFewSamples {
                n_samples,
                min_samples_split: self.min_samples_split,
            });
        }
        Ok(())
    }

    /// Grow a tree over `sample_indices` (duplicates allowed) of a
    /// pre-validated column-major dataset.
    pub(crate) fn grow(
        &self,
        col_features: &[Vec<f64>],
        labels: &[usize],
        sample_indices: &[usize],
        n_classes: usize,
        max_features: usize,
    ) -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();
        let mut builder = Builder {
            col_features,
            labels,
            n_classes,
            config: self,
            max_features,
            rng: &mut rng,
            arena: &mut arena,
        };
        let root = builder.build(sample_indices, 0);

        debug!(
            root_index = root.index(),
            n_nodes = arena.len(),
            n_samples = sample_indices.len(),
            "decision tree built"
        );

        DecisionTree {
            nodes: arena,
            n_features: col_features.len(),
            n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a row-major dataset and return its feature count.
pub(crate) fn validate_dataset(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if features.len() != labels.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

pub(crate) fn n_classes_of(labels: &[usize]) -> usize {
    labels.iter().max().copied().unwrap_or(0) + 1
}

pub(crate) fn to_column_major(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
        .collect()
}

struct Builder<'a> {
    col_features: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: &'a mut ChaCha8Rng,
    arena: &'a mut Vec<Node>,
}

impl Builder<'_> {
    /// Recursively build the subtree for `sample_indices` and return its root.
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();

        let mut class_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            class_counts[self.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split.max(2);
        let pure = class_counts.iter().filter(|&&c| c > 0).count() <= 1;

        let split = if too_few || pure || depth_exceeded {
            None
        } else {
            find_best_split(
                self.col_features,
                self.labels,
                sample_indices,
                self.n_classes,
                &self.config.criterion,
                self.max_features,
                self.config.min_samples_leaf,
                self.rng,
            )
        };

        let Some(split) = split else {
            let idx = self.arena.len();
            self.arena.push(Node::Leaf {
                prediction: majority_class(&class_counts),
                class_counts,
                impurity,
                n_samples,
            });
            return NodeIndex::new(idx);
        };

        // Reserve the slot, build children, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            class_counts: Vec::new(),
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };

        NodeIndex::new(node_idx)
    }
}

/// A fitted CART decision tree, stored as an arena of [`Node`]s.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Goes left at each split when `sample[feature] <= threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(self.leaf_prediction(sample))
    }

    /// Predict class labels for a batch of samples.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features.iter().map(|sample| self.predict(sample)).collect()
    }

    /// Sum of weighted impurity decreases per feature, unnormalized.
    #[must_use]
    pub fn impurity_decrease_by_feature(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        totals
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = self.impurity_decrease_by_feature();
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the arena of nodes; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree. A root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Walk from the root to a leaf; `sample` length is already checked.
    pub(crate) fn leaf_prediction(&self, sample: &[f64]) -> usize {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction, .. } => return *prediction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
