//! CART decision trees and random forests for binary and multi-class labels.
//!
//! Trees grow by exhaustive threshold search under the Gini (or entropy)
//! criterion. Forests train trees in parallel via rayon on bootstrap samples
//! drawn either from all records or per class (balanced bootstrap), predict
//! by majority vote, and report out-of-bag error and mean decrease in
//! impurity per feature.

mod config;
mod confusion;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod predict;
mod result;
mod split;
mod tree;

pub use config::{BootstrapPolicy, MaxFeatures, OobMode, RandomForestConfig};
pub use confusion::{BinaryConfusion, ConfusionMatrix, Rate};
pub use error::RfError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use oob::OobScore;
pub use predict::VoteShare;
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
