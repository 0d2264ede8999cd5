//! Mean decrease in Gini impurity aggregated across trees.

/// A feature ranked by its mean decrease in impurity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Total weighted impurity decrease per tree, averaged over trees.
    pub mean_decrease_gini: f64,
    /// `mean_decrease_gini` as a share of the sum over features.
    pub share: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Average per-tree impurity decreases and rank features by the result.
///
/// Ties keep column order.
pub(crate) fn aggregate_importances(
    per_tree: &[Vec<f64>],
    names: &[String],
) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return vec![];
    }

    let n_features = names.len();
    let mut totals = vec![0.0f64; n_features];
    for tree_decrease in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_decrease) {
            *total += val;
        }
    }
    let n_trees = per_tree.len() as f64;
    totals.iter_mut().for_each(|v| *v /= n_trees);

    let sum: f64 = totals.iter().sum();
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(&totals)
        .map(|(name, &mean)| RankedFeature {
            name: name.clone(),
            mean_decrease_gini: mean,
            share: if sum > 0.0 { mean / sum } else { 0.0 },
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.mean_decrease_gini.total_cmp(&a.mean_decrease_gini));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}
