//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::config::{BootstrapPolicy, MaxFeatures, OobMode, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig, n_classes_of, to_column_major, validate_dataset};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Where each tree's bootstrap draws come from.
enum DrawPlan {
    /// `n` draws from all samples.
    Pooled { n_samples: usize },
    /// `per_class` draws from each class's members.
    PerClass {
        members: Vec<Vec<usize>>,
        per_class: usize,
    },
}

impl DrawPlan {
    fn new(policy: BootstrapPolicy, labels: &[usize], n_classes: usize) -> Result<Self, RfError> {
        match policy {
            BootstrapPolicy::Standard => Ok(Self::Pooled {
                n_samples: labels.len(),
            }),
            BootstrapPolicy::Balanced { per_class } => {
                let mut members = vec![Vec::new(); n_classes];
                for (i, &label) in labels.iter().enumerate() {
                    members[label].push(i);
                }
                if let Some(class) = members.iter().position(Vec::is_empty) {
                    return Err(RfError::EmptyClass { class });
                }
                let smallest = members.iter().map(Vec::len).min().unwrap_or(0);
                let per_class = per_class.unwrap_or(smallest);
                if per_class == 0 {
                    return Err(RfError::InvalidBootstrapSize { per_class });
                }
                Ok(Self::PerClass { members, per_class })
            }
        }
    }

    fn draw_count(&self) -> usize {
        match self {
            Self::Pooled { n_samples } => *n_samples,
            Self::PerClass { members, per_class } => members.len() * per_class,
        }
    }

    /// Draw in-bag indices with replacement and return them with the out-of-bag set.
    fn sample(&self, n_samples: usize, rng: &mut impl Rng) -> (Vec<usize>, Vec<usize>) {
        let mut in_bag = vec![false; n_samples];
        let mut bootstrap_indices = Vec::with_capacity(self.draw_count());
        match self {
            Self::Pooled { n_samples: n } => {
                for _ in 0..*n {
                    bootstrap_indices.push(rng.gen_range(0..*n));
                }
            }
            Self::PerClass { members, per_class } => {
                for class_members in members {
                    for _ in 0..*per_class {
                        bootstrap_indices.push(class_members[rng.gen_range(0..class_members.len())]);
                    }
                }
            }
        }
        for &idx in &bootstrap_indices {
            in_bag[idx] = true;
        }
        let oob_indices = (0..n_samples).filter(|&i| !in_bag[i]).collect();
        (bootstrap_indices, oob_indices)
    }
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_dataset(features, labels)?;
    let n_samples = features.len();
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    let tree_template = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    tree_template.validate(n_samples)?;

    let n_classes = n_classes_of(labels);
    let plan = DrawPlan::new(config.bootstrap, labels, n_classes)?;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count = plan.draw_count(),
        "training random forest"
    );

    let col_features = to_column_major(features, n_features);

    // Per-tree seeds come from the master RNG so results do not depend on thread scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_results: Vec<(DecisionTree, Vec<usize>)> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (bootstrap_indices, oob_indices) = plan.sample(n_samples, &mut rng);
            let tree = tree_template.clone().with_seed(rng.r#gen()).grow(
                &col_features,
                labels,
                &bootstrap_indices,
                n_classes,
                max_features_resolved,
            );
            (tree, oob_indices)
        })
        .collect();

    let (trees, oob_indices_per_tree): (Vec<DecisionTree>, Vec<Vec<usize>>) =
        tree_results.into_iter().unzip();

    let per_tree_decreases: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::impurity_decrease_by_feature).collect();
    let importances = aggregate_importances(&per_tree_decreases, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    // With every sample in bag there is no estimate; the forest is kept.
    let oob_score = match config.oob_mode {
        OobMode::Enabled => {
            match compute_oob(&trees, features, labels, n_classes, &oob_indices_per_tree) {
                Ok(score) => Some(score),
                Err(RfError::OobEvaluationFailed { reason }) => {
                    warn!(%reason, "out-of-bag estimate unavailable");
                    None
                }
                Err(e) => return Err(e),
            }
        }
        OobMode::Disabled => None,
    };

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    let mut class_counts = vec![0usize; n_classes];
    for &label in labels {
        class_counts[label] += 1;
    }
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_samples,
        class_counts,
        mtry: max_features_resolved,
        bootstrap: config.bootstrap,
        draws_per_tree: plan.draw_count(),
    };

    info!(
        oob_error = oob_score.as_ref().map(|s| s.error_rate),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, importances, oob_score, metadata))
}
