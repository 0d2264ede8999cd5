//! Stratified train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{Label, LabeledTable};

/// A train/test pair that partitions one table.
#[derive(Debug, Clone)]
pub struct Split {
    train: LabeledTable,
    test: LabeledTable,
}

impl Split {
    /// Training subset.
    #[must_use]
    pub fn train(&self) -> &LabeledTable {
        &self.train
    }

    /// Held-out subset.
    #[must_use]
    pub fn test(&self) -> &LabeledTable {
        &self.test
    }
}

/// Stratified sampling of a training subset.
///
/// For each label, `round(train_fraction * class_size)` records (clamped so
/// both subsets receive at least one) are drawn into the training subset and
/// the rest form the test subset. Both subsets keep the source row order.
///
/// Construct via [`StratifiedSplit::new`], then chain `with_seed`.
#[derive(Debug, Clone)]
pub struct StratifiedSplit {
    train_fraction: f64,
    seed: u64,
}

impl StratifiedSplit {
    /// Create a partitioner with the given train fraction.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidTrainFraction`] unless `0.0 < train_fraction < 1.0`.
    pub fn new(train_fraction: f64) -> Result<Self, DataError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(DataError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }
        Ok(Self {
            train_fraction,
            seed: 42,
        })
    }

    /// Set the random seed for the per-class shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the train fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Partition `table` into a stratified train/test pair.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::EmptyDataset`] | `table` has no records |
    /// | [`DataError::InsufficientClassSize`] | a label has fewer than 2 records |
    #[instrument(skip_all, fields(n_records = table.n_records(), train_fraction = self.train_fraction))]
    pub fn split(&self, table: &LabeledTable) -> Result<Split, DataError> {
        if table.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut in_train = vec![false; table.n_records()];

        for label in Label::ALL {
            let mut members = table.indices_of(label);
            if members.len() < 2 {
                return Err(DataError::InsufficientClassSize {
                    class: label,
                    count: members.len(),
                    required: 2,
                });
            }
            members.shuffle(&mut rng);
            let n_train = ((members.len() as f64 * self.train_fraction).round() as usize)
                .clamp(1, members.len() - 1);
            for &i in &members[..n_train] {
                in_train[i] = true;
            }
            debug!(%label, n_class = members.len(), n_train, "class partitioned");
        }

        let (train_indices, test_indices): (Vec<usize>, Vec<usize>) =
            (0..table.n_records()).partition(|&i| in_train[i]);

        let split = Split {
            train: table.select(&train_indices),
            test: table.select(&test_indices),
        };

        info!(
            train = %split.train.class_counts(),
            test = %split.test.class_counts(),
            "stratified split complete"
        );

        Ok(split)
    }
}
