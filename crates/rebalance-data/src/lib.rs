//! Labeled tables, stratified partitioning, and class resampling.
//!
//! Everything in this crate is deterministic given an explicit seed: the
//! partitioner, the k-fold assignment, and each resampling strategy own a
//! `ChaCha8Rng` seeded per call, never a shared generator.

mod domain;
mod error;
mod folds;
mod partition;
mod resample;
mod smote;

pub use domain::{ClassCounts, Column, FeatureKind, Label, LabeledTable, Origin};
pub use error::DataError;
pub use folds::{FoldAssignment, StratifiedKFold};
pub use partition::{Split, StratifiedSplit};
pub use resample::{DownSample, Identity, Resampler, UpSample};
pub use smote::Smote;
