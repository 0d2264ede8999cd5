//! Out-of-bag (OOB) evaluation for Random Forest.

use crate::confusion::ConfusionMatrix;
use crate::error::RfError;
use crate::node::majority_class;
use crate::tree::DecisionTree;

/// Out-of-bag evaluation result.
#[derive(Debug, Clone)]
pub struct OobScore {
    /// Fraction of OOB-evaluated samples predicted correctly.
    pub accuracy: f64,
    /// `1 - accuracy`.
    pub error_rate: f64,
    /// Confusion matrix over OOB-evaluated samples.
    pub confusion: ConfusionMatrix,
    /// Number of samples that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Compute out-of-bag predictions and error.
///
/// Each sample is predicted by majority vote over the trees whose bootstrap
/// did not contain it. Samples with no such tree are skipped.
pub(crate) fn compute_oob(
    trees: &[DecisionTree],
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    oob_indices_per_tree: &[Vec<usize>],
) -> Result<OobScore, RfError> {
    let n_samples = features.len();

    let mut oob_votes: Vec<Vec<usize>> = vec![vec![0; n_classes]; n_samples];
    let mut has_oob = vec![false; n_samples];

    for (tree, oob_indices) in trees.iter().zip(oob_indices_per_tree) {
        for &sample_idx in oob_indices {
            let pred = tree.predict(&features[sample_idx])?;
            oob_votes[sample_idx][pred] += 1;
            has_oob[sample_idx] = true;
        }
    }

    let n_oob_samples = has_oob.iter().filter(|&&h| h).count();
    if n_oob_samples == 0 {
        return Err(RfError::OobEvaluationFailed {
            reason: "no sample has any OOB tree".to_string(),
        });
    }

    let mut rows = vec![vec![0usize; n_classes]; n_classes];
    for (i, votes) in oob_votes.iter().enumerate() {
        if has_oob[i] {
            rows[labels[i]][majority_class(votes)] += 1;
        }
    }
    let confusion = ConfusionMatrix::from_rows(rows);
    let accuracy = confusion.accuracy();

    Ok(OobScore {
        accuracy,
        error_rate: 1.0 - accuracy,
        confusion,
        n_oob_samples,
    })
}
