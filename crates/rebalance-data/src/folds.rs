//! Stratified k-fold assignment.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::DataError;
use crate::domain::Label;

/// Fold index per record, produced by [`StratifiedKFold::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    folds: Vec<usize>,
    n_folds: usize,
}

impl FoldAssignment {
    /// Number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Records held out when `fold` is the test fold.
    #[must_use]
    pub fn test_indices(&self, fold: usize) -> Vec<usize> {
        (0..self.folds.len()).filter(|&i| self.folds[i] == fold).collect()
    }

    /// Records used for training when `fold` is the test fold.
    #[must_use]
    pub fn train_indices(&self, fold: usize) -> Vec<usize> {
        (0..self.folds.len()).filter(|&i| self.folds[i] != fold).collect()
    }

    /// The raw per-record fold indices.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.folds
    }
}

/// Stratified k-fold assignment.
///
/// Records are grouped by label, shuffled within each label, and dealt
/// round-robin across folds. The dealing position carries over from one
/// label to the next so fold sizes differ by at most one.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_folds: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a k-fold assigner.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, DataError> {
        if n_folds < 2 {
            return Err(DataError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for the within-class shuffle.
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

    /// Assign every record to a fold.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::EmptyDataset`] | `labels` is empty |
    /// | [`DataError::TooFewSamplesForFolds`] | a present label has fewer records than folds |
    pub fn assign(&self, labels: &[Label]) -> Result<FoldAssignment, DataError> {
        if labels.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds = vec![0usize; labels.len()];
        let mut offset = 0usize;

        for label in Label::ALL {
            let mut members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == label)
                .map(|(i, _)| i)
                .collect();
            if members.is_empty() {
                continue;
            }
            if members.len() < self.n_folds {
                return Err(DataError::TooFewSamplesForFolds {
                    class: label,
                    count: members.len(),
                    n_folds: self.n_folds,
                });
            }
            members.shuffle(&mut rng);
            for (j, &idx) in members.iter().enumerate() {
                folds[idx] = (offset + j) % self.n_folds;
            }
            offset += members.len();
        }

        debug!(n_folds = self.n_folds, n_records = labels.len(), "folds assigned");

        Ok(FoldAssignment {
            folds,
            n_folds: self.n_folds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_normal: usize, n_abnormal: usize) -> Vec<Label> {
        let mut v = vec![Label::Normal; n_normal];
        v.extend(vec![Label::Abnormal; n_abnormal]);
        v
    }

    #[test]
    fn every_fold_gets_each_class() {
        let labels = labels(88, 12);
        let folds = StratifiedKFold::new(10).unwrap().assign(&labels).unwrap();
        for fold in 0..10 {
            let test = folds.test_indices(fold);
            let n_abnormal = test.iter().filter(|&&i| labels[i] == Label::Abnormal).count();
            assert!((1..=2).contains(&n_abnormal), "fold {fold}: {n_abnormal}");
            assert!((9..=11).contains(&test.len()), "fold {fold}: {}", test.len());
        }
    }

    #[test]
    fn folds_partition_records() {
        let labels = labels(30, 10);
        let folds = StratifiedKFold::new(5).unwrap().assign(&labels).unwrap();
        let mut seen = vec![0usize; labels.len()];
        for fold in 0..5 {
            for i in folds.test_indices(fold) {
                seen[i] += 1;
            }
            assert_eq!(
                folds.train_indices(fold).len() + folds.test_indices(fold).len(),
                labels.len()
            );
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn deterministic_for_seed() {
        let labels = labels(20, 10);
        let a = StratifiedKFold::new(5).unwrap().with_seed(1).assign(&labels).unwrap();
        let b = StratifiedKFold::new(5).unwrap().with_seed(1).assign(&labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_minority_records() {
        let err = StratifiedKFold::new(5).unwrap().assign(&labels(10, 3)).unwrap_err();
        assert!(matches!(
            err,
            DataError::TooFewSamplesForFolds {
                class: Label::Abnormal,
                count: 3,
                n_folds: 5
            }
        ));
    }

    #[test]
    fn invalid_fold_count() {
        assert!(StratifiedKFold::new(0).is_err());
        assert!(StratifiedKFold::new(1).is_err());
    }
}
