//! Scoring predictions against true labels.

use std::fmt;

use rebalance_data::{Label, LabeledTable};
use rebalance_rf::{BinaryConfusion, ConfusionMatrix, Rate};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::EvalError;
use crate::trainer::FittedModel;

/// A sensitivity or specificity that is zero or undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateMetric {
    /// No positive record was predicted positive.
    ZeroSensitivity,
    /// The evaluation set has no positive record.
    UndefinedSensitivity,
    /// No negative record was predicted negative.
    ZeroSpecificity,
    /// The evaluation set has no negative record.
    UndefinedSpecificity,
}

impl DegenerateMetric {
    /// Warnings raised by a pair of rates.
    #[must_use]
    pub fn detect(sensitivity: Rate, specificity: Rate) -> Vec<Self> {
        let mut out = Vec::new();
        match sensitivity {
            Rate::Undefined => out.push(DegenerateMetric::UndefinedSensitivity),
            Rate::Defined(v) if v == 0.0 => out.push(DegenerateMetric::ZeroSensitivity),
            Rate::Defined(_) => {}
        }
        match specificity {
            Rate::Undefined => out.push(DegenerateMetric::UndefinedSpecificity),
            Rate::Defined(v) if v == 0.0 => out.push(DegenerateMetric::ZeroSpecificity),
            Rate::Defined(_) => {}
        }
        out
    }

    /// Whether this warning concerns sensitivity.
    #[must_use]
    pub fn is_sensitivity(self) -> bool {
        matches!(
            self,
            DegenerateMetric::ZeroSensitivity | DegenerateMetric::UndefinedSensitivity
        )
    }
}

impl fmt::Display for DegenerateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DegenerateMetric::ZeroSensitivity => "sensitivity is 0: no positive record detected",
            DegenerateMetric::UndefinedSensitivity => "sensitivity undefined: no positive records",
            DegenerateMetric::ZeroSpecificity => "specificity is 0: every negative record flagged",
            DegenerateMetric::UndefinedSpecificity => "specificity undefined: no negative records",
        })
    }
}

/// Predictions and the metrics derived from them.
#[derive(Debug, Clone)]
pub struct Evaluation {
    predictions: Vec<Label>,
    confusion: ConfusionMatrix,
    binary: BinaryConfusion,
    warnings: Vec<DegenerateMetric>,
}

impl Evaluation {
    /// Predicted labels, in evaluation-set order.
    #[must_use]
    pub fn predictions(&self) -> &[Label] {
        &self.predictions
    }

    /// Two-class confusion matrix, rows are true labels.
    #[must_use]
    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    /// Counts relative to the positive class.
    #[must_use]
    pub fn binary(&self) -> BinaryConfusion {
        self.binary
    }

    /// `(TP + TN) / total`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.binary.accuracy()
    }

    /// `1 - accuracy`.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        self.binary.error_rate()
    }

    /// `TP / (TP + FN)`.
    #[must_use]
    pub fn sensitivity(&self) -> Rate {
        self.binary.sensitivity()
    }

    /// `TN / (TN + FP)`.
    #[must_use]
    pub fn specificity(&self) -> Rate {
        self.binary.specificity()
    }

    /// Zero or undefined rates.
    #[must_use]
    pub fn warnings(&self) -> &[DegenerateMetric] {
        &self.warnings
    }
}

/// Scores a fitted model on held-out records.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    positive: Label,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Label::Abnormal)
    }
}

impl Evaluator {
    /// Create an evaluator that treats `positive` as the positive class.
    #[must_use]
    pub fn new(positive: Label) -> Self {
        Self { positive }
    }

    /// Return the positive class.
    #[must_use]
    pub fn positive(&self) -> Label {
        self.positive
    }

    /// Predict every record of `test` with `model` and score the result.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyEvaluation`] | `test` has no records |
    /// | [`EvalError::SchemaMismatch`] | `test` width differs from the model's |
    /// | [`EvalError::Model`] | prediction failed |
    /// | [`EvalError::UnknownClass`] | the model predicted a class outside the label set |
    #[instrument(skip_all, fields(n_records = test.n_records()))]
    pub fn evaluate(&self, model: &FittedModel, test: &LabeledTable) -> Result<Evaluation, EvalError> {
        if test.is_empty() {
            return Err(EvalError::EmptyEvaluation);
        }
        if test.n_features() != model.n_features() {
            return Err(EvalError::SchemaMismatch {
                expected: model.n_features(),
                got: test.n_features(),
            });
        }
        let predicted = to_labels(model.predict_batch(test.rows())?)?;
        self.from_predictions(test.labels(), &predicted)
    }

    /// Score already-made predictions against `truth`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyEvaluation`] | `truth` is empty |
    /// | [`EvalError::Model`] | the slices differ in length |
    #[allow(clippy::wrong_self_convention)]
    pub fn from_predictions(&self, truth: &[Label], predicted: &[Label]) -> Result<Evaluation, EvalError> {
        if truth.is_empty() {
            return Err(EvalError::EmptyEvaluation);
        }
        let true_idx: Vec<usize> = truth.iter().map(|l| l.index()).collect();
        let pred_idx: Vec<usize> = predicted.iter().map(|l| l.index()).collect();
        let confusion = ConfusionMatrix::from_labels(&true_idx, &pred_idx, Label::ALL.len())?;
        let binary = confusion.binary(self.positive.index())?;

        let warnings = DegenerateMetric::detect(binary.sensitivity(), binary.specificity());
        for w in &warnings {
            warn!(metric = ?w, "{w}");
        }

        Ok(Evaluation {
            predictions: predicted.to_vec(),
            confusion,
            binary,
            warnings,
        })
    }
}

fn to_labels(classes: Vec<usize>) -> Result<Vec<Label>, EvalError> {
    classes
        .into_iter()
        .map(|class| Label::from_index(class).ok_or(EvalError::UnknownClass { class }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Abnormal as A, Normal as N};

    #[test]
    fn accuracy_and_error_sum_to_one() {
        let truth = [N, N, N, A, A];
        let pred = [N, A, N, A, N];
        let e = Evaluator::default().from_predictions(&truth, &pred).unwrap();
        assert!((e.accuracy() + e.error_rate() - 1.0).abs() < 1e-12);
        assert!((e.accuracy() - 0.6).abs() < 1e-12);
        assert_eq!(e.sensitivity(), Rate::Defined(0.5));
        assert!((e.specificity().value().unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!(e.warnings().is_empty());
    }

    #[test]
    fn all_normal_predictions_flag_zero_sensitivity() {
        let mut truth = vec![N; 29];
        truth.extend([A; 4]);
        let pred = vec![N; 33];
        let e = Evaluator::default().from_predictions(&truth, &pred).unwrap();
        assert!((e.accuracy() - 29.0 / 33.0).abs() < 1e-12);
        assert_eq!(e.sensitivity(), Rate::Defined(0.0));
        assert_eq!(e.specificity(), Rate::Defined(1.0));
        assert_eq!(e.warnings(), &[DegenerateMetric::ZeroSensitivity]);
    }

    #[test]
    fn missing_class_is_undefined() {
        let e = Evaluator::default().from_predictions(&[N, N], &[N, A]).unwrap();
        assert_eq!(e.sensitivity(), Rate::Undefined);
        assert_eq!(e.warnings(), &[DegenerateMetric::UndefinedSensitivity]);
    }

    #[test]
    fn positive_class_is_configurable() {
        let e = Evaluator::new(N).from_predictions(&[N, N, A], &[N, A, A]).unwrap();
        assert_eq!(e.sensitivity(), Rate::Defined(0.5));
        assert_eq!(e.specificity(), Rate::Defined(1.0));
    }

    #[test]
    fn rejects_empty_and_mismatched() {
        assert!(matches!(
            Evaluator::default().from_predictions(&[], &[]),
            Err(EvalError::EmptyEvaluation)
        ));
        assert!(matches!(
            Evaluator::default().from_predictions(&[N, A], &[N]),
            Err(EvalError::Model(_))
        ));
    }

    #[test]
    fn out_of_range_class_is_an_error() {
        assert_eq!(to_labels(vec![0, 1, 0]).unwrap(), vec![N, A, N]);
        assert!(matches!(
            to_labels(vec![0, 2, 1]),
            Err(EvalError::UnknownClass { class: 2 })
        ));
    }
}
