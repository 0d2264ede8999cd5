//! Confusion matrices and binary classification rates.

use std::fmt;

use crate::error::RfError;

/// A ratio that is undefined when its denominator is zero.
///
/// Serializes as a number, or `null` when undefined.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Rate {
    /// `numerator / denominator` with a non-zero denominator.
    Defined(f64),
    /// The denominator was zero.
    Undefined,
}

impl Rate {
    /// Build `numerator / denominator`, or [`Rate::Undefined`] when the denominator is zero.
    #[must_use]
    pub fn from_counts(numerator: usize, denominator: usize) -> Self {
        if denominator == 0 {
            Rate::Undefined
        } else {
            Rate::Defined(numerator as f64 / denominator as f64)
        }
    }

    /// Return the value, if defined.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Rate::Defined(v) => Some(v),
            Rate::Undefined => None,
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::Defined(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Rate::Undefined => f.write_str("undefined"),
        }
    }
}

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::PredictionCountMismatch`] | Slices differ in length |
    /// | [`RfError::LabelOutOfRange`] | A label is not below `n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::PredictionCountMismatch {
                n_true: true_labels.len(),
                n_predicted: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            for label in [t, p] {
                if label >= n_classes {
                    return Err(RfError::LabelOutOfRange {
                        label,
                        index,
                        n_classes,
                    });
                }
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Build a matrix directly from counts; rows are true classes.
    pub(crate) fn from_rows(matrix: Vec<Vec<usize>>) -> Self {
        let n_classes = matrix.len();
        Self { matrix, n_classes }
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    /// Number of samples on the diagonal.
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..self.n_classes).map(|i| self.matrix[i][i]).sum()
    }

    /// Collapse to a two-class view with `positive` as the positive class.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::NotBinary`] unless the matrix has exactly two
    /// classes and `positive` is 0 or 1.
    pub fn binary(&self, positive: usize) -> Result<BinaryConfusion, RfError> {
        if self.n_classes != 2 || positive > 1 {
            return Err(RfError::NotBinary {
                n_classes: self.n_classes,
                positive,
            });
        }
        let negative = 1 - positive;
        Ok(BinaryConfusion {
            true_positive: self.matrix[positive][positive],
            false_negative: self.matrix[positive][negative],
            false_positive: self.matrix[negative][positive],
            true_negative: self.matrix[negative][negative],
        })
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Two-class confusion counts relative to a chosen positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BinaryConfusion {
    /// Positive records predicted positive.
    pub true_positive: usize,
    /// Positive records predicted negative.
    pub false_negative: usize,
    /// Negative records predicted positive.
    pub false_positive: usize,
    /// Negative records predicted negative.
    pub true_negative: usize,
}

impl BinaryConfusion {
    /// Number of records counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_negative + self.false_positive + self.true_negative
    }

    /// Number of positive records.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.true_positive + self.false_negative
    }

    /// Number of negative records.
    #[must_use]
    pub fn negatives(&self) -> usize {
        self.false_positive + self.true_negative
    }

    /// `(TP + TN) / total`; 0.0 when nothing was counted.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positive + self.true_negative) as f64 / total as f64
        }
    }

    /// `1 - accuracy`.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy()
    }

    /// `TP / (TP + FN)`; undefined without positive records.
    #[must_use]
    pub fn sensitivity(&self) -> Rate {
        Rate::from_counts(self.true_positive, self.positives())
    }

    /// `TN / (TN + FP)`; undefined without negative records.
    #[must_use]
    pub fn specificity(&self) -> Rate {
        Rate::from_counts(self.true_negative, self.negatives())
    }
}
