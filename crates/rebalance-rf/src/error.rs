/// Errors from tree and forest training, prediction, and scoring.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_split is zero.
    #[error("min_samples_split must be at least 1, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The invalid min_samples_split value provided.
        min_samples_split: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when the training set is smaller than min_samples_split.
    #[error("training set has {n_samples} samples, fewer than min_samples_split = {min_samples_split}")]
    TooFewSamples {
        /// Number of training samples.
        n_samples: usize,
        /// The configured minimum split size.
        min_samples_split: usize,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when features and labels differ in length.
    #[error("{n_samples} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a balanced bootstrap asks for zero draws per class.
    #[error("balanced bootstrap needs at least 1 draw per class, got {per_class}")]
    InvalidBootstrapSize {
        /// The invalid per-class draw count.
        per_class: usize,
    },

    /// Returned when balanced bootstrap sampling finds a class with no records.
    #[error("class {class} has no training samples, balanced bootstrap needs every class")]
    EmptyClass {
        /// The class with no records.
        class: usize,
    },

    /// Returned when a label is outside `[0, n_classes)`.
    #[error("label {label} at position {index} is outside [0, {n_classes})")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Position of the label in its slice.
        index: usize,
        /// Number of classes.
        n_classes: usize,
    },

    /// Returned when true and predicted label slices differ in length.
    #[error("{n_true} true labels but {n_predicted} predictions")]
    PredictionCountMismatch {
        /// Number of true labels.
        n_true: usize,
        /// Number of predicted labels.
        n_predicted: usize,
    },

    /// Returned when binary metrics are requested from a non-binary matrix.
    #[error("binary metrics need a 2-class matrix with positive class 0 or 1, got {n_classes} classes and positive {positive}")]
    NotBinary {
        /// Number of classes in the matrix.
        n_classes: usize,
        /// The requested positive class.
        positive: usize,
    },

    /// Returned when OOB evaluation fails (no sample has any OOB tree).
    #[error("OOB evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Human-readable description of why OOB evaluation failed.
        reason: String,
    },
}
