//! Domain types: labels, column schema, and labeled tables.

use std::fmt;

use serde::Serialize;

use crate::DataError;

/// Diagnosis label of a donor record.
///
/// The zero-based class index (`Normal` = 0, `Abnormal` = 1) is what the
/// classifiers see. `Abnormal` is the positive class for sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Normal seminal diagnosis (`N` in the source file).
    Normal,
    /// Altered seminal diagnosis (`O` in the source file).
    Abnormal,
}

impl Label {
    /// Both labels in class-index order.
    pub const ALL: [Label; 2] = [Label::Normal, Label::Abnormal];

    /// Return the zero-based class index.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Label::Normal => 0,
            Label::Abnormal => 1,
        }
    }

    /// Map a class index back to a label.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Label::Normal),
            1 => Some(Label::Abnormal),
            _ => None,
        }
    }

    /// Lower-case name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Abnormal => "abnormal",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a predictor column is interpreted by distance-based resamplers.
///
/// Tree induction treats every column as ordered numeric codes either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Real-valued column (interpolated by SMOTE).
    Continuous,
    /// Coded column (copied from one parent by SMOTE).
    Categorical,
}

/// A named predictor column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    name: String,
    kind: FeatureKind,
}

impl Column {
    /// Create a column descriptor.
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column kind.
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }
}

/// Where a record in a derived table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// Copy of the record at this row index of the loaded dataset.
    Original(usize),
    /// Record synthesized by SMOTE.
    Synthetic,
}

/// Per-label record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    /// Records labeled [`Label::Normal`].
    pub normal: usize,
    /// Records labeled [`Label::Abnormal`].
    pub abnormal: usize,
}

impl ClassCounts {
    /// Count labels.
    #[must_use]
    pub fn from_labels(labels: &[Label]) -> Self {
        let mut counts = Self::default();
        for label in labels {
            match label {
                Label::Normal => counts.normal += 1,
                Label::Abnormal => counts.abnormal += 1,
            }
        }
        counts
    }

    /// Count for one label.
    #[must_use]
    pub fn get(&self, label: Label) -> usize {
        match label {
            Label::Normal => self.normal,
            Label::Abnormal => self.abnormal,
        }
    }

    /// Total number of records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.normal + self.abnormal
    }

    /// The larger class. On a tie this is [`Label::Normal`].
    #[must_use]
    pub fn majority(&self) -> Label {
        if self.abnormal > self.normal {
            Label::Abnormal
        } else {
            Label::Normal
        }
    }

    /// The smaller class. On a tie this is [`Label::Abnormal`].
    #[must_use]
    pub fn minority(&self) -> Label {
        match self.majority() {
            Label::Normal => Label::Abnormal,
            Label::Abnormal => Label::Normal,
        }
    }

    /// Fraction of records carrying `label`; 0.0 for an empty table.
    #[must_use]
    pub fn proportion(&self, label: Label) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(label) as f64 / total as f64
        }
    }

    /// Majority count divided by minority count (infinite when the minority is empty).
    #[must_use]
    pub fn imbalance_ratio(&self) -> f64 {
        let minority = self.get(self.minority());
        if minority == 0 {
            f64::INFINITY
        } else {
            self.get(self.majority()) as f64 / minority as f64
        }
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "normal={} abnormal={}", self.normal, self.abnormal)
    }
}

/// An immutable table of labeled records sharing one column schema.
///
/// Rows, labels, and origins are parallel vectors: `rows[i]`, `labels[i]`,
/// and `origins[i]` describe the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    columns: Vec<Column>,
    rows: Vec<Vec<f64>>,
    labels: Vec<Label>,
    origins: Vec<Origin>,
}

impl LabeledTable {
    /// Build a table of original records; record `i` gets [`Origin::Original(i)`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::LengthMismatch`] | `rows` and `labels` differ in length |
    /// | [`DataError::RowWidthMismatch`] | a row does not match the schema width |
    /// | [`DataError::NonFiniteValue`] | a value is NaN or infinite |
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<f64>>,
        labels: Vec<Label>,
    ) -> Result<Self, DataError> {
        if rows.len() != labels.len() {
            return Err(DataError::LengthMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataError::RowWidthMismatch {
                    row_index,
                    expected: columns.len(),
                    got: row.len(),
                });
            }
            if let Some(column_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(DataError::NonFiniteValue {
                    row_index,
                    column_index,
                });
            }
        }
        let origins = (0..rows.len()).map(Origin::Original).collect();
        Ok(Self {
            columns,
            rows,
            labels,
            origins,
        })
    }

    /// Assemble a derived table from already-validated parts.
    pub(crate) fn from_parts(
        columns: Vec<Column>,
        rows: Vec<Vec<f64>>,
        labels: Vec<Label>,
        origins: Vec<Origin>,
    ) -> Self {
        debug_assert_eq!(rows.len(), labels.len());
        debug_assert_eq!(rows.len(), origins.len());
        Self {
            columns,
            rows,
            labels,
            origins,
        }
    }

    /// Copy the records at `indices` (in that order) into a new table.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            origins: indices.iter().map(|&i| self.origins[i]).collect(),
        }
    }

    /// Indices of the records labeled `label`, in table order.
    #[must_use]
    pub fn indices_of(&self, label: Label) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Column schema.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in schema order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Feature rows (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Labels, parallel to [`rows`](Self::rows).
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Zero-based class indices, parallel to [`rows`](Self::rows).
    #[must_use]
    pub fn class_indices(&self) -> Vec<usize> {
        self.labels.iter().map(|l| l.index()).collect()
    }

    /// Record origins, parallel to [`rows`](Self::rows).
    #[must_use]
    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// Number of records.
    #[must_use]
    pub fn n_records(&self) -> usize {
        self.rows.len()
    }

    /// Number of predictor columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// `true` when the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-label record counts.
    #[must_use]
    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("age", FeatureKind::Continuous),
            Column::new("smoking_habit", FeatureKind::Categorical),
        ]
    }

    #[test]
    fn label_index_round_trip() {
        for label in Label::ALL {
            assert_eq!(Label::from_index(label.index()), Some(label));
        }
        assert_eq!(Label::from_index(2), None);
    }

    #[test]
    fn class_counts_majority_and_ratio() {
        let labels = [Label::Normal, Label::Normal, Label::Normal, Label::Abnormal];
        let counts = ClassCounts::from_labels(&labels);
        assert_eq!(counts.majority(), Label::Normal);
        assert_eq!(counts.minority(), Label::Abnormal);
        assert!((counts.imbalance_ratio() - 3.0).abs() < f64::EPSILON);
        assert!((counts.proportion(Label::Abnormal) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn tied_counts_pick_normal_as_majority() {
        let counts = ClassCounts {
            normal: 4,
            abnormal: 4,
        };
        assert_eq!(counts.majority(), Label::Normal);
        assert_eq!(counts.minority(), Label::Abnormal);
    }

    #[test]
    fn empty_minority_ratio_is_infinite() {
        let counts = ClassCounts {
            normal: 5,
            abnormal: 0,
        };
        assert!(counts.imbalance_ratio().is_infinite());
    }

    #[test]
    fn new_assigns_original_origins() {
        let table = LabeledTable::new(
            columns(),
            vec![vec![0.5, 1.0], vec![0.7, -1.0]],
            vec![Label::Normal, Label::Abnormal],
        )
        .unwrap();
        assert_eq!(table.origins(), &[Origin::Original(0), Origin::Original(1)]);
        assert_eq!(table.class_indices(), vec![0, 1]);
    }

    #[test]
    fn length_mismatch_rejected() {
        let err = LabeledTable::new(columns(), vec![vec![0.5, 1.0]], vec![]).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { rows: 1, labels: 0 }));
    }

    #[test]
    fn row_width_mismatch_rejected() {
        let err = LabeledTable::new(columns(), vec![vec![0.5]], vec![Label::Normal]).unwrap_err();
        assert!(matches!(err, DataError::RowWidthMismatch { row_index: 0, .. }));
    }

    #[test]
    fn non_finite_rejected() {
        let err = LabeledTable::new(columns(), vec![vec![0.5, f64::NAN]], vec![Label::Normal])
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::NonFiniteValue {
                row_index: 0,
                column_index: 1
            }
        ));
    }

    #[test]
    fn select_keeps_origins() {
        let table = LabeledTable::new(
            columns(),
            vec![vec![0.1, 0.0], vec![0.2, 0.0], vec![0.3, 1.0]],
            vec![Label::Normal, Label::Abnormal, Label::Normal],
        )
        .unwrap();
        let picked = table.select(&[2, 0]);
        assert_eq!(picked.origins(), &[Origin::Original(2), Origin::Original(0)]);
        assert_eq!(picked.labels(), &[Label::Normal, Label::Normal]);
        assert_eq!(table.indices_of(Label::Abnormal), vec![1]);
    }
}
