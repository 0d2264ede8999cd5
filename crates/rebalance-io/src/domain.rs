//! Domain types for rebalance-io.

use rebalance_data::{Column, FeatureKind, Label};

use crate::IoError;

/// Predictors of the fertility dataset, in file order.
pub const FERTILITY_PREDICTORS: [(&str, FeatureKind); 9] = [
    ("season", FeatureKind::Categorical),
    ("age", FeatureKind::Continuous),
    ("childish_diseases", FeatureKind::Categorical),
    ("accident_trauma", FeatureKind::Categorical),
    ("surgical_intervention", FeatureKind::Categorical),
    ("high_fevers", FeatureKind::Categorical),
    ("alcohol_frequency", FeatureKind::Continuous),
    ("smoking_habit", FeatureKind::Categorical),
    ("sitting_hours", FeatureKind::Continuous),
];

/// Column schema of the fertility predictors.
#[must_use]
pub fn fertility_schema() -> Vec<Column> {
    FERTILITY_PREDICTORS
        .iter()
        .map(|&(name, kind)| Column::new(name, kind))
        .collect()
}

/// Decode a diagnosis cell: `N`/`normal` or `O`/`abnormal`, any case.
#[must_use]
pub fn parse_label(raw: &str) -> Option<Label> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "n" | "normal" => Some(Label::Normal),
        "o" | "abnormal" => Some(Label::Abnormal),
        _ => None,
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
