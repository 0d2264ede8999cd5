use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// A split must lower weighted impurity by more than this to be accepted.
pub(crate) const MIN_IMPURITY_DECREASE: f64 = 1e-12;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// Returns `0.0` when `n_samples` is zero.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `n * parent - n_left * left - n_right * right`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Find the best split among a random subset of `max_features` features.
///
/// Each candidate feature's `(value, label)` pairs are sorted and scanned
/// left to right with incremental class counts. Thresholds sit halfway
/// between adjacent distinct values. The first candidate with the largest
/// weighted decrease wins.
///
/// Returns `None` when no split lowers impurity by more than
/// [`MIN_IMPURITY_DECREASE`] while respecting `min_samples_leaf`.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: &SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }
    let parent_impurity = criterion.impurity(&parent_counts, n_samples);

    // Partial Fisher-Yates over the first `take` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = MIN_IMPURITY_DECREASE;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let feat_col = &features[feat_idx];

        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (feat_col[si], si)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = parent_counts.clone();

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = labels[si];
            left_counts[class_i] += 1;
            right_counts[class_i] -= 1;

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_counts, n_left);
            let right_impurity = criterion.impurity(&right_counts, n_right);
            let decrease = (n_samples as f64) * parent_impurity.value()
                - (n_left as f64) * left_impurity.value()
                - (n_right as f64) * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), (val_i + val_next) / 2.0));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease,
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitCriterion, find_best_split};

    fn best(
        features: &[Vec<f64>],
        labels: &[usize],
        max_features: usize,
        min_leaf: usize,
    ) -> Option<super::SplitResult> {
        let idx: Vec<usize> = (0..labels.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        find_best_split(
            features,
            labels,
            &idx,
            2,
            &SplitCriterion::Gini,
            max_features,
            min_leaf,
            &mut rng,
        )
    }

    #[test]
    fn gini_values() {
        assert!(SplitCriterion::Gini.impurity(&[10, 0], 10).value().abs() < f64::EPSILON);
        assert!((SplitCriterion::Gini.impurity(&[5, 5], 10).value() - 0.5).abs() < f64::EPSILON);
        let three = SplitCriterion::Gini.impurity(&[100, 100, 100], 300).value();
        assert!((three - 2.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn entropy_values() {
        assert!(SplitCriterion::Entropy.impurity(&[10, 0], 10).value().abs() < f64::EPSILON);
        let h = SplitCriterion::Entropy.impurity(&[5, 5], 10).value();
        assert!((h - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn separable_data_finds_midpoint() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let split = best(&features, &labels, 1, 1).expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        // 6 * 0.5 - 0 - 0
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        assert!(best(&features, &[0, 0, 1, 1], 1, 1).is_none());
    }

    #[test]
    fn pure_node_returns_none() {
        let features = vec![vec![1.0, 2.0, 3.0, 4.0]];
        assert!(best(&features, &[1, 1, 1, 1], 1, 1).is_none());
    }

    #[test]
    fn zero_decrease_split_rejected() {
        // Every threshold leaves both children at the parent's 50/50 mix.
        let features = vec![vec![1.0, 1.0, 2.0, 2.0]];
        assert!(best(&features, &[0, 1, 0, 1], 1, 1).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        assert!(best(&features, &[0, 1], 1, 2).is_none());
    }

    #[test]
    fn picks_informative_feature_when_all_considered() {
        let features = vec![
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let split = best(&features, &labels, 2, 1).expect("split");
        assert_eq!(split.feature.index(), 1);
    }
}
