//! Class-rebalancing strategies applied to a training subset.

use std::fmt;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::DataError;
use crate::domain::{Label, LabeledTable};

/// A stateless transformation of a training subset's class distribution.
///
/// Implementations keep the column schema and only ever see training data.
/// The same input and seed always produce the same output.
pub trait Resampler: fmt::Debug + Send + Sync {
    /// Short strategy name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Produce a rebalanced copy of `train`.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] when the strategy's class-size precondition is violated.
    fn resample(&self, train: &LabeledTable, seed: u64) -> Result<LabeledTable, DataError>;
}

/// Leaves the training subset untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Resampler for Identity {
    fn name(&self) -> &'static str {
        "none"
    }

    fn resample(&self, train: &LabeledTable, _seed: u64) -> Result<LabeledTable, DataError> {
        Ok(train.clone())
    }
}

/// Random down-sampling of the majority class to the minority count.
///
/// Majority records are drawn without replacement; every minority record
/// is kept. Output holds `Normal` records first, then `Abnormal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownSample;

impl Resampler for DownSample {
    fn name(&self) -> &'static str {
        "down"
    }

    #[instrument(skip_all, fields(n_records = train.n_records(), seed = seed))]
    fn resample(&self, train: &LabeledTable, seed: u64) -> Result<LabeledTable, DataError> {
        let counts = train.class_counts();
        let minority = counts.minority();
        let n_minority = counts.get(minority);
        if n_minority == 0 {
            return Err(DataError::InsufficientClassSize {
                class: minority,
                count: 0,
                required: 1,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut selected = Vec::with_capacity(2 * n_minority);
        for label in Label::ALL {
            let members = train.indices_of(label);
            if label == minority {
                selected.extend_from_slice(&members);
            } else {
                let picks = index::sample(&mut rng, members.len(), n_minority);
                selected.extend(picks.iter().map(|p| members[p]));
            }
        }

        let out = train.select(&selected);
        debug!(before = %counts, after = %out.class_counts(), "down-sampled");
        Ok(out)
    }
}

/// Random up-sampling of the minority class to the majority count.
///
/// Every original minority record is kept and the shortfall is drawn with
/// replacement from the minority. Output holds `Normal` records first.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpSample;

impl Resampler for UpSample {
    fn name(&self) -> &'static str {
        "up"
    }

    #[instrument(skip_all, fields(n_records = train.n_records(), seed = seed))]
    fn resample(&self, train: &LabeledTable, seed: u64) -> Result<LabeledTable, DataError> {
        let counts = train.class_counts();
        let minority = counts.minority();
        let n_majority = counts.get(counts.majority());
        let n_minority = counts.get(minority);
        if n_minority == 0 {
            return Err(DataError::InsufficientClassSize {
                class: minority,
                count: 0,
                required: 1,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut selected = Vec::with_capacity(2 * n_majority);
        for label in Label::ALL {
            let members = train.indices_of(label);
            selected.extend_from_slice(&members);
            if label == minority {
                for _ in 0..(n_majority - n_minority) {
                    selected.push(members[rng.gen_range(0..members.len())]);
                }
            }
        }

        let out = train.select(&selected);
        debug!(before = %counts, after = %out.class_counts(), "up-sampled");
        Ok(out)
    }
}
