//! The comparison table: one row per method, in methodology order.

use std::fmt;

use rebalance_data::ClassCounts;
use rebalance_rf::{BinaryConfusion, RankedFeature, Rate};
use serde::Serialize;

use crate::crossval::CrossValidationResult;
use crate::evaluator::{DegenerateMetric, Evaluation};
use crate::experiment::{Method, Protocol};
use crate::trainer::ModelKind;
use crate::tuning::CandidateScore;

/// Per-fold accuracy of a cross-validated branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldSummary {
    /// Accuracy on each held-out fold.
    pub accuracies: Vec<f64>,
    /// Mean fold accuracy.
    pub mean: f64,
    /// Standard deviation of fold accuracy.
    pub std: f64,
}

impl From<&CrossValidationResult> for FoldSummary {
    fn from(result: &CrossValidationResult) -> Self {
        Self {
            accuracies: result.fold_accuracies.clone(),
            mean: result.mean_accuracy,
            std: result.std_accuracy,
        }
    }
}

/// Metrics of one successful branch.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRow {
    /// The rebalancing method.
    pub method: Method,
    /// How the metrics were obtained.
    pub protocol: Protocol,
    /// Classifier kind.
    pub model: ModelKind,
    /// Features drawn per split, for forests.
    pub mtry: Option<usize>,
    /// `(TP + TN) / total`.
    pub accuracy: f64,
    /// `1 - accuracy`.
    pub error_rate: f64,
    /// `TP / (TP + FN)`.
    pub sensitivity: Rate,
    /// `TN / (TN + FP)`.
    pub specificity: Rate,
    /// Counts relative to the positive class.
    pub confusion: BinaryConfusion,
    /// Class distribution of the data the model was trained on.
    pub train_counts: ClassCounts,
    /// Out-of-bag error of the forest, if any.
    pub oob_error: Option<f64>,
    /// Forest features ranked by mean decrease in Gini.
    pub importances: Vec<RankedFeature>,
    /// Per-fold accuracy, for the cross-validated branch.
    pub folds: Option<FoldSummary>,
    /// Every mtry candidate tried, for the cross-validated branch.
    pub mtry_scores: Vec<CandidateScore>,
    /// Zero or undefined rates.
    pub warnings: Vec<DegenerateMetric>,
}

impl MetricRow {
    /// Build a row from an evaluation; optional fields start empty.
    #[must_use]
    pub fn new(
        method: Method,
        model: ModelKind,
        evaluation: &Evaluation,
        train_counts: ClassCounts,
    ) -> Self {
        Self {
            method,
            protocol: method.protocol(),
            model,
            mtry: None,
            accuracy: evaluation.accuracy(),
            error_rate: evaluation.error_rate(),
            sensitivity: evaluation.sensitivity(),
            specificity: evaluation.specificity(),
            confusion: evaluation.binary(),
            train_counts,
            oob_error: None,
            importances: Vec::new(),
            folds: None,
            mtry_scores: Vec::new(),
            warnings: evaluation.warnings().to_vec(),
        }
    }
}

/// Result of one branch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    /// The branch produced metrics.
    Completed(MetricRow),
    /// The branch stopped with an error.
    Failed {
        /// The rebalancing method.
        method: Method,
        /// Error message.
        reason: String,
    },
}

impl BranchOutcome {
    /// The method this outcome belongs to.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            BranchOutcome::Completed(row) => row.method,
            BranchOutcome::Failed { method, .. } => *method,
        }
    }

    /// The metrics, if the branch completed.
    #[must_use]
    pub fn row(&self) -> Option<&MetricRow> {
        match self {
            BranchOutcome::Completed(row) => Some(row),
            BranchOutcome::Failed { .. } => None,
        }
    }
}

/// Branch outcomes in the order they were run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ComparisonTable {
    rows: Vec<BranchOutcome>,
}

impl ComparisonTable {
    /// Wrap outcomes without reordering them.
    #[must_use]
    pub fn new(rows: Vec<BranchOutcome>) -> Self {
        Self { rows }
    }

    /// Every outcome, in order.
    #[must_use]
    pub fn rows(&self) -> &[BranchOutcome] {
        &self.rows
    }

    /// The outcome for `method`, if it was run.
    #[must_use]
    pub fn get(&self, method: Method) -> Option<&BranchOutcome> {
        self.rows.iter().find(|r| r.method() == method)
    }

    /// Number of failed branches.
    #[must_use]
    pub fn n_failed(&self) -> usize {
        self.rows.iter().filter(|r| r.row().is_none()).count()
    }
}

fn render_rate(rate: Rate, degenerate: bool) -> String {
    let mark = if degenerate { "!" } else { "" };
    match rate {
        Rate::Defined(v) => format!("{v:.4}{mark}"),
        Rate::Undefined => format!("undefined{mark}"),
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>10} {:>12} {:>12}",
            "Method", "Accuracy", "Sensitivity", "Specificity"
        )?;
        writeln!(f, "{}", "-".repeat(57))?;

        let mut notes = Vec::new();
        let mut pooled = false;
        for outcome in &self.rows {
            match outcome {
                BranchOutcome::Completed(row) => {
                    let sens_bad = row.warnings.iter().any(|w| w.is_sensitivity());
                    let spec_bad = row.warnings.iter().any(|w| !w.is_sensitivity());
                    let marker = match row.protocol {
                        Protocol::PooledCv => {
                            pooled = true;
                            " (pooled CV)"
                        }
                        Protocol::HeldOut => "",
                    };
                    writeln!(
                        f,
                        "{:<20} {:>10.4} {:>12} {:>12}{marker}",
                        row.method.label(),
                        row.accuracy,
                        render_rate(row.sensitivity, sens_bad),
                        render_rate(row.specificity, spec_bad),
                    )?;
                    for w in &row.warnings {
                        notes.push(format!("{}: {w}", row.method.label()));
                    }
                }
                BranchOutcome::Failed { method, reason } => {
                    writeln!(f, "{:<20} FAILED ({reason})", method.label())?;
                }
            }
        }

        if pooled || !notes.is_empty() {
            writeln!(f)?;
        }
        if pooled {
            writeln!(
                f,
                "(pooled CV) scored on out-of-fold predictions over the whole dataset; \
                 other rows on the held-out test partition"
            )?;
        }
        for note in notes {
            writeln!(f, "! {note}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rebalance_data::Label;

    use super::*;
    use crate::evaluator::Evaluator;

    fn row(method: Method, truth: &[Label], pred: &[Label]) -> BranchOutcome {
        let evaluation = Evaluator::default().from_predictions(truth, pred).unwrap();
        BranchOutcome::Completed(MetricRow::new(
            method,
            ModelKind::Forest,
            &evaluation,
            ClassCounts::from_labels(truth),
        ))
    }

    fn table() -> ComparisonTable {
        use Label::{Abnormal as A, Normal as N};
        ComparisonTable::new(vec![
            row(Method::Imbalanced, &[N, N, N, A], &[N, N, N, N]),
            BranchOutcome::Failed {
                method: Method::KFold,
                reason: "class abnormal has 3 records, fewer than 10 folds".to_string(),
            },
            row(Method::DownSampling, &[N, N, A, A], &[N, A, A, N]),
        ])
    }

    #[test]
    fn keeps_insertion_order() {
        let t = table();
        let methods: Vec<Method> = t.rows().iter().map(BranchOutcome::method).collect();
        assert_eq!(methods, vec![Method::Imbalanced, Method::KFold, Method::DownSampling]);
        assert_eq!(t.n_failed(), 1);
        assert!(t.get(Method::Smote).is_none());
    }

    #[test]
    fn renders_markers_and_footnotes() {
        let out = table().to_string();
        let imbalanced = out.lines().find(|l| l.starts_with("Imbalanced")).unwrap();
        assert!(imbalanced.contains("0.7500"));
        assert!(imbalanced.contains("0.0000!"));
        assert!(imbalanced.contains("1.0000"));
        assert!(!imbalanced.contains("1.0000!"));
        assert!(out.contains("K-fold CV            FAILED (class abnormal has 3 records"));
        let down = out.lines().find(|l| l.starts_with("Down-sampling")).unwrap();
        assert!(down.contains("0.5000"));
        assert!(!down.contains('!'));
        assert!(out.contains("! Imbalanced: sensitivity is 0"));
    }

    #[test]
    fn flags_pooled_cv_row() {
        use Label::{Abnormal as A, Normal as N};
        let t = ComparisonTable::new(vec![
            row(Method::Imbalanced, &[N, N, A, A], &[N, N, A, A]),
            row(Method::KFold, &[N, N, A, A], &[N, N, A, A]),
        ]);
        let out = t.to_string();
        let kfold = out.lines().find(|l| l.starts_with("K-fold CV")).unwrap();
        assert!(kfold.ends_with("(pooled CV)"));
        let imbalanced = out.lines().find(|l| l.starts_with("Imbalanced")).unwrap();
        assert!(!imbalanced.contains("pooled"));
        assert!(out.contains("(pooled CV) scored on out-of-fold predictions"));

        // A failed k-fold row carries no metrics to qualify.
        assert!(!table().to_string().contains("(pooled CV)"));
    }

    #[test]
    fn renders_undefined() {
        assert_eq!(render_rate(Rate::Undefined, true), "undefined!");
        assert_eq!(render_rate(Rate::Defined(2.0 / 3.0), false), "0.6667");
    }
}
