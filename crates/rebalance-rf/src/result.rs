//! What a forest fit returns besides the trees.

use crate::config::BootstrapPolicy;
use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;

/// How a forest was trained.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Training records.
    pub n_samples: usize,
    /// Training records per class index.
    pub class_counts: Vec<usize>,
    /// Features drawn at each split.
    pub mtry: usize,
    /// Per-tree sampling policy.
    pub bootstrap: BootstrapPolicy,
    /// Records drawn into each tree's bootstrap sample.
    pub draws_per_tree: usize,
}

/// A fitted forest with its out-of-bag estimate and Gini importances.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    oob_score: Option<OobScore>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        oob_score: Option<OobScore>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            oob_score,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Features by descending mean decrease in Gini.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// `None` unless trained with [`OobMode::Enabled`](crate::OobMode::Enabled), or when
    /// every sample was in bag for every tree.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    /// Out-of-bag misclassification rate, if computed.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.oob_score.as_ref().map(|s| s.error_rate)
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
