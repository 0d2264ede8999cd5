//! JSON report writer for comparison runs.

use std::fs;
use std::path::{Path, PathBuf};

use rebalance_data::ClassCounts;
use rebalance_eval::{
    BranchOutcome, BranchSeeds, ComparisonTable, DegenerateMetric, ExperimentConfig,
    ExperimentOutcome, Hyperparameters, Method, ModelKind,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes comparison reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Reports are named `{experiment}_comparison.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Path of the comparison report.
    #[must_use]
    pub fn comparison_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_comparison.json", self.experiment.as_str()))
    }

    /// Write a comparison run to `{experiment}_comparison.json` and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | the report cannot be encoded |
    /// | [`IoError::WriteFile`] | the file cannot be written |
    #[instrument(skip_all, fields(experiment = %self.experiment))]
    pub fn write_comparison(
        &self,
        config: &ExperimentConfig,
        outcome: &ExperimentOutcome,
    ) -> Result<PathBuf, IoError> {
        let path = self.comparison_path();

        let failures: Vec<FailureEntry<'_>> = outcome
            .table
            .rows()
            .iter()
            .filter_map(|row| match row {
                BranchOutcome::Failed { method, reason } => Some(FailureEntry {
                    method: *method,
                    reason,
                }),
                BranchOutcome::Completed(_) => None,
            })
            .collect();

        let warnings: Vec<WarningEntry> = outcome
            .table
            .rows()
            .iter()
            .filter_map(BranchOutcome::row)
            .flat_map(|row| {
                row.warnings.iter().map(|&warning| WarningEntry {
                    method: row.method,
                    warning,
                    message: warning.to_string(),
                })
            })
            .collect();

        let artifact = ComparisonArtifact {
            experiment: self.experiment.as_str(),
            config: ConfigEntry {
                model: config.model(),
                params: config.params(),
                train_fraction: config.train_fraction(),
                n_folds: config.n_folds(),
                smote_k: config.smote().k(),
                smote_perc_over: config.smote().perc_over(),
                smote_perc_under: config.smote().perc_under(),
                seed: config.seed(),
            },
            dataset_counts: outcome.dataset_counts,
            train_counts: outcome.train_counts,
            test_counts: outcome.test_counts,
            tuned_mtry: outcome.tuned_mtry,
            seeds: &outcome.seeds,
            rows: &outcome.table,
            failures,
            warnings,
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "comparison report written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ComparisonArtifact<'a> {
    experiment: &'a str,
    config: ConfigEntry,
    dataset_counts: ClassCounts,
    train_counts: ClassCounts,
    test_counts: ClassCounts,
    tuned_mtry: Option<usize>,
    seeds: &'a BranchSeeds,
    rows: &'a ComparisonTable,
    failures: Vec<FailureEntry<'a>>,
    warnings: Vec<WarningEntry>,
}

#[derive(Serialize)]
struct ConfigEntry {
    model: ModelKind,
    params: Hyperparameters,
    train_fraction: f64,
    n_folds: usize,
    smote_k: usize,
    smote_perc_over: u32,
    smote_perc_under: u32,
    seed: u64,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
    method: Method,
    reason: &'a str,
}

#[derive(Serialize)]
struct WarningEntry {
    method: Method,
    warning: DegenerateMetric,
    message: String,
}

#[cfg(test)]
mod tests {
    use rebalance_data::{Column, FeatureKind, Label, LabeledTable};
    use rebalance_eval::{MtrySearch, run_comparison};
    use tempfile::TempDir;

    use super::*;

    fn table() -> LabeledTable {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let abnormal = i % 5 == 0;
            let x = if abnormal { 3.0 } else { 0.0 } + (i % 4) as f64 * 0.1;
            rows.push(vec![x, (i % 2) as f64]);
            labels.push(if abnormal { Label::Abnormal } else { Label::Normal });
        }
        let columns = vec![
            Column::new("x", FeatureKind::Continuous),
            Column::new("flag", FeatureKind::Categorical),
        ];
        LabeledTable::new(columns, rows, labels).unwrap()
    }

    fn run() -> (ExperimentConfig, ExperimentOutcome) {
        let params = Hyperparameters {
            n_trees: 10,
            mtry: 1,
            ..Hyperparameters::default()
        };
        let config = ExperimentConfig::new()
            .with_params(params)
            .with_n_folds(5)
            .with_search(MtrySearch::FullGrid);
        let outcome = run_comparison(&config, &table()).unwrap();
        (config, outcome)
    }

    #[test]
    fn writes_named_report() {
        let dir = TempDir::new().unwrap();
        let writer =
            ReportWriter::new(dir.path(), ExperimentName::new("unit".into()).unwrap()).unwrap();
        let (config, outcome) = run();
        let path = writer.write_comparison(&config, &outcome).unwrap();
        assert_eq!(path, dir.path().join("unit_comparison.json"));

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(content["experiment"], "unit");
        assert_eq!(content["config"]["model"], "forest");
        assert_eq!(content["config"]["smote_k"], 8);
        assert_eq!(content["dataset_counts"]["abnormal"], 12);
        assert_eq!(content["rows"].as_array().unwrap().len(), 6);
        assert_eq!(content["rows"][1]["protocol"], "pooled_cv");
        assert!(content["failures"].is_array());
    }

    #[test]
    fn failed_branches_listed() {
        let dir = TempDir::new().unwrap();
        let writer =
            ReportWriter::new(dir.path(), ExperimentName::new("fail".into()).unwrap()).unwrap();
        let (config, outcome) = run();
        let path = writer.write_comparison(&config, &outcome).unwrap();
        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        // Eight training minority records cannot feed SMOTE with k = 8.
        let failures = content["failures"].as_array().unwrap();
        assert_eq!(failures.len(), outcome.table.n_failed());
        assert!(failures.iter().any(|f| f["method"] == "smote"));
        let smote = &content["rows"][4];
        assert_eq!(smote["status"], "failed");
    }

    #[test]
    fn creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = ReportWriter::new(&nested, ExperimentName::new("x".into()).unwrap()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(writer.comparison_path(), nested.join("x_comparison.json"));
    }
}
