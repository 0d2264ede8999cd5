//! Synthetic minority over-sampling (SMOTE) with majority under-sampling.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{FeatureKind, LabeledTable, Origin};
use crate::resample::Resampler;

/// SMOTE configuration.
///
/// Construct via [`Smote::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter    | Default |
/// |--------------|---------|
/// | `perc_over`  | 200     |
/// | `perc_under` | 200     |
///
/// With the defaults every minority record yields two synthetic records and
/// the majority is reduced to twice the number of synthetic records (or
/// kept whole when it is already smaller).
#[derive(Debug, Clone)]
pub struct Smote {
    k: usize,
    perc_over: u32,
    perc_under: u32,
}

impl Smote {
    /// Create a SMOTE resampler using `k` nearest minority neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidNeighborCount`] if `k` is zero.
    pub fn new(k: usize) -> Result<Self, DataError> {
        if k == 0 {
            return Err(DataError::InvalidNeighborCount { k });
        }
        Ok(Self {
            k,
            perc_over: 200,
            perc_under: 200,
        })
    }

    /// Set the over-sampling percentage.
    ///
    /// At or above 100 each minority record yields `perc_over / 100`
    /// synthetic records; below 100 a random `perc_over`% of the minority
    /// yields one each.
    #[must_use]
    pub fn with_perc_over(mut self, perc_over: u32) -> Self {
        self.perc_over = perc_over;
        self
    }

    /// Set the majority sample size as a percentage of the synthetic count.
    #[must_use]
    pub fn with_perc_under(mut self, perc_under: u32) -> Self {
        self.perc_under = perc_under;
        self
    }

    /// Return the neighbour count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the over-sampling percentage.
    #[must_use]
    pub fn perc_over(&self) -> u32 {
        self.perc_over
    }

    /// Return the under-sampling percentage.
    #[must_use]
    pub fn perc_under(&self) -> u32 {
        self.perc_under
    }

    /// Per minority position, the number of synthetic records it seeds.
    fn seed_counts(&self, n_minority: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        if self.perc_over >= 100 {
            return vec![(self.perc_over / 100) as usize; n_minority];
        }
        let n_seeds = ((f64::from(self.perc_over) / 100.0 * n_minority as f64).round() as usize)
            .clamp(1, n_minority);
        let mut counts = vec![0usize; n_minority];
        for pos in index::sample(rng, n_minority, n_seeds).iter() {
            counts[pos] = 1;
        }
        counts
    }
}

impl Default for Smote {
    /// `k = 8` with the default percentages.
    fn default() -> Self {
        Self {
            k: 8,
            perc_over: 200,
            perc_under: 200,
        }
    }
}

impl Resampler for Smote {
    fn name(&self) -> &'static str {
        "smote"
    }

    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::InvalidOversampling`] | `perc_over` is zero |
    /// | [`DataError::InsufficientNeighbors`] | minority size is not greater than `k` |
    #[instrument(skip_all, fields(n_records = train.n_records(), k = self.k, seed = seed))]
    fn resample(&self, train: &LabeledTable, seed: u64) -> Result<LabeledTable, DataError> {
        if self.perc_over == 0 {
            return Err(DataError::InvalidOversampling {
                perc_over: self.perc_over,
            });
        }

        let counts = train.class_counts();
        let minority = counts.minority();
        let majority = counts.majority();
        let minority_idx = train.indices_of(minority);
        if minority_idx.len() <= self.k {
            return Err(DataError::InsufficientNeighbors {
                minority: minority_idx.len(),
                k: self.k,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let kinds: Vec<FeatureKind> = train.columns().iter().map(|c| c.kind()).collect();
        let minority_rows: Vec<&[f64]> = minority_idx
            .iter()
            .map(|&i| train.rows()[i].as_slice())
            .collect();
        let ranges = column_ranges(&minority_rows, &kinds);

        let neighbours: Vec<Vec<usize>> = (0..minority_rows.len())
            .map(|pos| nearest_neighbours(&minority_rows, pos, self.k, &kinds, &ranges))
            .collect();

        let mut synthetic = Vec::new();
        for (pos, reps) in self.seed_counts(minority_rows.len(), &mut rng).into_iter().enumerate() {
            for _ in 0..reps {
                let nn = neighbours[pos][rng.gen_range(0..self.k)];
                synthetic.push(interpolate(minority_rows[pos], minority_rows[nn], &kinds, &mut rng));
            }
        }

        let majority_idx = train.indices_of(majority);
        let n_majority = ((f64::from(self.perc_under) / 100.0 * synthetic.len() as f64) as usize)
            .min(majority_idx.len());
        let majority_picks: Vec<usize> = index::sample(&mut rng, majority_idx.len(), n_majority)
            .iter()
            .map(|p| majority_idx[p])
            .collect();

        let mut rows = Vec::with_capacity(n_majority + minority_idx.len() + synthetic.len());
        let mut labels = Vec::with_capacity(rows.capacity());
        let mut origins = Vec::with_capacity(rows.capacity());
        for &i in majority_picks.iter().chain(&minority_idx) {
            rows.push(train.rows()[i].clone());
            labels.push(train.labels()[i]);
            origins.push(train.origins()[i]);
        }
        let n_synthetic = synthetic.len();
        for row in synthetic {
            rows.push(row);
            labels.push(minority);
            origins.push(Origin::Synthetic);
        }

        let out = LabeledTable::from_parts(train.columns().to_vec(), rows, labels, origins);
        info!(
            before = %counts,
            after = %out.class_counts(),
            n_synthetic,
            "SMOTE complete"
        );
        Ok(out)
    }
}

/// Value range of each continuous column over `rows`; `None` for
/// categorical or constant columns.
fn column_ranges(rows: &[&[f64]], kinds: &[FeatureKind]) -> Vec<Option<f64>> {
    kinds
        .iter()
        .enumerate()
        .map(|(col, kind)| {
            if *kind == FeatureKind::Categorical {
                return None;
            }
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r[col]), hi.max(r[col]))
            });
            let range = hi - lo;
            (range > 0.0).then_some(range)
        })
        .collect()
}

/// Squared distance: range-scaled Euclidean over continuous columns plus
/// one per mismatched categorical column.
fn distance(a: &[f64], b: &[f64], kinds: &[FeatureKind], ranges: &[Option<f64>]) -> f64 {
    kinds
        .iter()
        .enumerate()
        .map(|(col, kind)| match kind {
            FeatureKind::Categorical => {
                if (a[col] - b[col]).abs() > f64::EPSILON {
                    1.0
                } else {
                    0.0
                }
            }
            FeatureKind::Continuous => match ranges[col] {
                Some(range) => {
                    let d = (a[col] - b[col]) / range;
                    d * d
                }
                None => 0.0,
            },
        })
        .sum()
}

/// Positions of the `k` nearest other rows to `rows[pos]`, closest first.
///
/// Equal distances are ordered by position so the result is deterministic.
fn nearest_neighbours(
    rows: &[&[f64]],
    pos: usize,
    k: usize,
    kinds: &[FeatureKind],
    ranges: &[Option<f64>],
) -> Vec<usize> {
    let mut candidates: Vec<(f64, usize)> = (0..rows.len())
        .filter(|&other| other != pos)
        .map(|other| (distance(rows[pos], rows[other], kinds, ranges), other))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    candidates.truncate(k);
    debug!(pos, nearest = ?candidates.first(), "neighbours ranked");
    candidates.into_iter().map(|(_, other)| other).collect()
}

/// Synthesize a record between `base` and `neighbour`.
fn interpolate(
    base: &[f64],
    neighbour: &[f64],
    kinds: &[FeatureKind],
    rng: &mut ChaCha8Rng,
) -> Vec<f64> {
    kinds
        .iter()
        .enumerate()
        .map(|(col, kind)| match kind {
            FeatureKind::Continuous => {
                let gap: f64 = rng.r#gen();
                base[col] + gap * (neighbour[col] - base[col])
            }
            FeatureKind::Categorical => {
                if rng.gen_bool(0.5) {
                    base[col]
                } else {
                    neighbour[col]
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, Label};

    /// Majority on the left of `x`, minority on the right, with a binary code column.
    fn train(n_normal: usize, n_abnormal: usize) -> LabeledTable {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_normal {
            rows.push(vec![i as f64 * 0.1, (i % 2) as f64]);
            labels.push(Label::Normal);
        }
        for i in 0..n_abnormal {
            rows.push(vec![10.0 + i as f64 * 0.5, (i % 2) as f64]);
            labels.push(Label::Abnormal);
        }
        let columns = vec![
            Column::new("x", FeatureKind::Continuous),
            Column::new("flag", FeatureKind::Categorical),
        ];
        LabeledTable::new(columns, rows, labels).unwrap()
    }

    #[test]
    fn default_ratios_on_59_12() {
        let t = train(59, 12);
        let out = Smote::new(8).unwrap().resample(&t, 3).unwrap();
        let counts = out.class_counts();
        // 12 minority -> 24 synthetic; majority min(48, 59).
        assert_eq!(counts.abnormal, 36);
        assert_eq!(counts.normal, 48);
    }

    #[test]
    fn minority_grows_majority_never_grows() {
        let t = train(20, 10);
        let before = t.class_counts();
        let out = Smote::new(3).unwrap().resample(&t, 1).unwrap();
        let after = out.class_counts();
        assert!(after.abnormal > before.abnormal);
        assert!(after.normal <= before.normal);
    }

    #[test]
    fn synthetic_records_stay_inside_minority_hull() {
        let t = train(30, 10);
        let out = Smote::new(4).unwrap().resample(&t, 8).unwrap();
        for (i, origin) in out.origins().iter().enumerate() {
            if *origin == Origin::Synthetic {
                let row = &out.rows()[i];
                assert!((10.0..=14.5).contains(&row[0]), "x = {}", row[0]);
                assert!(row[1] == 0.0 || row[1] == 1.0, "flag = {}", row[1]);
                assert_eq!(out.labels()[i], Label::Abnormal);
            }
        }
    }

    #[test]
    fn insufficient_neighbors_when_minority_not_above_k() {
        let t = train(40, 8);
        let err = Smote::new(8).unwrap().resample(&t, 0).unwrap_err();
        assert!(matches!(err, DataError::InsufficientNeighbors { minority: 8, k: 8 }));
    }

    #[test]
    fn fractional_over_sampling_seeds_subset() {
        let t = train(40, 10);
        let out = Smote::new(2)
            .unwrap()
            .with_perc_over(50)
            .with_perc_under(100)
            .resample(&t, 4)
            .unwrap();
        let n_synthetic = out.origins().iter().filter(|o| **o == Origin::Synthetic).count();
        assert_eq!(n_synthetic, 5);
        assert_eq!(out.class_counts().normal, 5);
    }

    #[test]
    fn deterministic_for_seed() {
        let t = train(25, 10);
        let smote = Smote::new(3).unwrap();
        assert_eq!(smote.resample(&t, 12).unwrap(), smote.resample(&t, 12).unwrap());
    }

    #[test]
    fn zero_k_and_zero_over_rejected() {
        assert!(matches!(
            Smote::new(0).unwrap_err(),
            DataError::InvalidNeighborCount { k: 0 }
        ));
        let t = train(20, 10);
        let err = Smote::new(2).unwrap().with_perc_over(0).resample(&t, 0).unwrap_err();
        assert!(matches!(err, DataError::InvalidOversampling { perc_over: 0 }));
    }

    #[test]
    fn neighbours_exclude_self_and_are_closest() {
        let rows: Vec<Vec<f64>> = vec![vec![0.0], vec![1.0], vec![5.0], vec![1.5]];
        let refs: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
        let kinds = [FeatureKind::Continuous];
        let ranges = column_ranges(&refs, &kinds);
        assert_eq!(nearest_neighbours(&refs, 1, 2, &kinds, &ranges), vec![3, 0]);
    }
}
