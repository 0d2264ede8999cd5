//! Majority-vote prediction for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::node::majority_class;

/// Per-class tree vote counts for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteShare {
    votes: Vec<usize>,
}

impl VoteShare {
    /// Class with the most votes; ties go to the lowest class index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        majority_class(&self.votes)
    }

    /// Fraction of trees voting for `class`.
    #[must_use]
    pub fn fraction(&self, class: usize) -> f64 {
        let total: usize = self.votes.iter().sum();
        match self.votes.get(class) {
            Some(&v) if total > 0 => v as f64 / total as f64,
            _ => 0.0,
        }
    }

    /// Raw vote counts indexed by class.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.votes
    }
}

impl RandomForest {
    /// Predict the class label for a single sample by majority vote.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.votes(sample)?.predicted_class())
    }

    /// Count each tree's predicted class for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn votes(&self, sample: &[f64]) -> Result<VoteShare, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.leaf_prediction(sample)] += 1;
        }
        Ok(VoteShare { votes })
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return vote counts for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn votes_batch(&self, features: &[Vec<f64>]) -> Result<Vec<VoteShare>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.votes(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use super::VoteShare;
    use crate::{RandomForestConfig, RfError};

    #[test]
    fn vote_tie_goes_to_lowest_class() {
        let share = VoteShare { votes: vec![5, 5] };
        assert_eq!(share.predicted_class(), 0);
        assert!((share.fraction(1) - 0.5).abs() < f64::EPSILON);
        assert!(share.fraction(7).abs() < f64::EPSILON);
    }

    #[test]
    fn votes_sum_to_tree_count() {
        let features = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
        let labels = vec![0, 0, 1, 1];
        let result = RandomForestConfig::new(15)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap();
        let forest = result.forest();
        let batch = forest.votes_batch(&features).unwrap();
        for (sample, share) in features.iter().zip(&batch) {
            assert_eq!(share.as_slice().iter().sum::<usize>(), 15);
            assert_eq!(forest.predict(sample).unwrap(), share.predicted_class());
        }
    }

    #[test]
    fn feature_mismatch_rejected() {
        let result = RandomForestConfig::new(2)
            .unwrap()
            .fit(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[0, 1], &[])
            .unwrap();
        assert!(matches!(
            result.forest().predict(&[1.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }
}
