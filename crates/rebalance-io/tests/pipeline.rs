//! End-to-end integration tests: CSV -> comparison -> JSON report.

use std::fs;
use std::path::{Path, PathBuf};

use rebalance_eval::{ExperimentConfig, Hyperparameters, Method, MtrySearch, run_comparison};
use rebalance_io::{ExperimentName, FertilityReader, ReportWriter};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config() -> ExperimentConfig {
    let params = Hyperparameters {
        n_trees: 30,
        ..Hyperparameters::default()
    };
    ExperimentConfig::new()
        .with_params(params)
        .with_search(MtrySearch::Random { n_candidates: 3 })
}

#[test]
fn fixture_loads_as_88_to_12() {
    let table = FertilityReader::new(&fixture_path("fertility_100.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(table.n_records(), 100);
    assert_eq!(table.n_features(), 9);
    let counts = table.class_counts();
    assert_eq!((counts.normal, counts.abnormal), (88, 12));
}

#[test]
fn comparison_round_trip() {
    let table = FertilityReader::new(&fixture_path("fertility_100.csv"))
        .read()
        .unwrap();
    let config = config();
    let outcome = run_comparison(&config, &table).unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ReportWriter::new(
        dir.path(),
        ExperimentName::new("fertility".into()).unwrap(),
    )
    .unwrap();
    let path = writer.write_comparison(&config, &outcome).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "fertility");
    assert_eq!(content["train_counts"]["normal"], 59);
    assert_eq!(content["train_counts"]["abnormal"], 8);
    assert_eq!(content["test_counts"]["normal"], 29);
    assert_eq!(content["test_counts"]["abnormal"], 4);

    let rows = content["rows"].as_array().unwrap();
    assert_eq!(rows.len(), Method::ALL.len());
    let expected = [
        "imbalanced",
        "k_fold",
        "down_sampling",
        "up_sampling",
        "smote",
        "balanced_bootstrap",
    ];
    for (row, method) in rows.iter().zip(expected) {
        assert_eq!(row["method"], method);
    }

    let down = &rows[2];
    assert_eq!(down["status"], "completed");
    assert_eq!(down["train_counts"]["normal"], 8);
    assert_eq!(down["train_counts"]["abnormal"], 8);
    assert_eq!(down["importances"].as_array().unwrap().len(), 9);
    assert!(down["oob_error"].is_number());

    let kfold = &rows[1];
    assert_eq!(kfold["protocol"], "pooled_cv");
    assert_eq!(kfold["mtry_scores"].as_array().unwrap().len(), 3);
    assert_eq!(content["tuned_mtry"], kfold["mtry"]);

    for row in rows.iter().filter(|r| r["status"] == "completed") {
        for rate in ["sensitivity", "specificity"] {
            let v = &row[rate];
            assert!(
                v.is_null() || (0.0..=1.0).contains(&v.as_f64().unwrap()),
                "{rate} = {v}"
            );
        }
        let acc = row["accuracy"].as_f64().unwrap();
        let err = row["error_rate"].as_f64().unwrap();
        assert!((acc + err - 1.0).abs() < 1e-12);
    }
}

#[test]
fn header_less_file_reads_same_records() {
    let dir = TempDir::new().unwrap();
    let original = fs::read_to_string(fixture_path("fertility_100.csv")).unwrap();
    let body: String = original.lines().skip(1).map(|l| format!("{l}\n")).collect();
    let raw = dir.path().join("fertility_raw.txt");
    fs::write(&raw, body).unwrap();

    let with_header = FertilityReader::new(&fixture_path("fertility_100.csv"))
        .read()
        .unwrap();
    let without = FertilityReader::new(&raw).with_header(false).read().unwrap();
    assert_eq!(with_header.rows(), without.rows());
    assert_eq!(with_header.labels(), without.labels());
}
