//! Dataset loading and report writing for the rebalance pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, FERTILITY_PREDICTORS, fertility_schema, parse_label};
pub use error::IoError;
pub use reader::FertilityReader;
pub use writer::ReportWriter;
