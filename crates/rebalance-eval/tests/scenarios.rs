//! End-to-end comparison runs on a synthetic 88:12 dataset.

use rebalance_data::{Column, DownSample, FeatureKind, Label, LabeledTable, Resampler, Smote};
use rebalance_eval::{
    BranchOutcome, ExperimentConfig, Hyperparameters, Method, ModelKind, MtrySearch, Protocol,
    run_comparison,
};
use rebalance_rf::Rate;

fn columns() -> Vec<Column> {
    [
        ("season", FeatureKind::Categorical),
        ("age", FeatureKind::Continuous),
        ("childish_diseases", FeatureKind::Categorical),
        ("accident_trauma", FeatureKind::Categorical),
        ("surgical_intervention", FeatureKind::Categorical),
        ("high_fevers", FeatureKind::Categorical),
        ("alcohol_frequency", FeatureKind::Continuous),
        ("smoking_habit", FeatureKind::Categorical),
        ("sitting_hours", FeatureKind::Continuous),
    ]
    .into_iter()
    .map(|(name, kind)| Column::new(name, kind))
    .collect()
}

/// 88 normal and 12 abnormal records; abnormal ones sit more hours.
fn fertility_like() -> LabeledTable {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..100 {
        let abnormal = i % 8 == 3 && labels.iter().filter(|&&l| l == Label::Abnormal).count() < 12;
        let season = [-1.0, -0.33, 0.33, 1.0][i % 4];
        let age = 0.5 + (i % 17) as f64 * 0.025;
        let sitting = if abnormal { 0.6 + (i % 5) as f64 * 0.05 } else { 0.1 + (i % 7) as f64 * 0.05 };
        rows.push(vec![
            season,
            age,
            (i % 2) as f64,
            (i % 3 == 0) as u8 as f64,
            (i % 5 == 0) as u8 as f64,
            [-1.0, 0.0, 1.0][i % 3],
            0.2 + (i % 5) as f64 * 0.2,
            [-1.0, 0.0, 1.0][(i / 3) % 3],
            sitting,
        ]);
        labels.push(if abnormal { Label::Abnormal } else { Label::Normal });
    }
    LabeledTable::new(columns(), rows, labels).unwrap()
}

fn small_forest() -> Hyperparameters {
    Hyperparameters {
        n_trees: 25,
        ..Hyperparameters::default()
    }
}

fn config() -> ExperimentConfig {
    ExperimentConfig::new()
        .with_params(small_forest())
        .with_search(MtrySearch::Grid(vec![1, 3, 5]))
        .with_seed(11)
}

#[test]
fn dataset_is_88_to_12() {
    let counts = fertility_like().class_counts();
    assert_eq!(counts.normal, 88);
    assert_eq!(counts.abnormal, 12);
}

#[test]
fn partition_is_59_8_and_29_4() {
    let outcome = run_comparison(&config(), &fertility_like()).unwrap();
    assert_eq!((outcome.train_counts.normal, outcome.train_counts.abnormal), (59, 8));
    assert_eq!((outcome.test_counts.normal, outcome.test_counts.abnormal), (29, 4));

    let row = outcome.table.get(Method::Imbalanced).unwrap().row().unwrap();
    assert_eq!(row.train_counts, outcome.train_counts);
    assert_eq!(row.confusion.total(), 33);
    assert_eq!(row.protocol, Protocol::HeldOut);
}

#[test]
fn down_sampling_trains_on_8_and_8() {
    let outcome = run_comparison(&config(), &fertility_like()).unwrap();
    let row = outcome.table.get(Method::DownSampling).unwrap().row().unwrap();
    assert_eq!((row.train_counts.normal, row.train_counts.abnormal), (8, 8));

    let train = fertility_like().select(&(0..67).collect::<Vec<_>>());
    let down = DownSample.resample(&train, 3).unwrap();
    assert_eq!(down.n_records(), 2 * train.class_counts().abnormal);
}

#[test]
fn rows_follow_methodology_order() {
    let outcome = run_comparison(&config(), &fertility_like()).unwrap();
    let methods: Vec<Method> = outcome.table.rows().iter().map(BranchOutcome::method).collect();
    assert_eq!(methods, Method::ALL.to_vec());
}

#[test]
fn kfold_tunes_mtry_for_later_branches() {
    let outcome = run_comparison(&config(), &fertility_like()).unwrap();
    let kfold = outcome.table.get(Method::KFold).unwrap().row().unwrap();
    assert_eq!(kfold.protocol, Protocol::PooledCv);
    assert_eq!(kfold.confusion.total(), 100);
    assert_eq!(kfold.mtry_scores.len(), 3);
    assert_eq!(kfold.folds.as_ref().unwrap().accuracies.len(), 10);

    let tuned = outcome.tuned_mtry.unwrap();
    assert!([1, 3, 5].contains(&tuned));
    assert_eq!(kfold.mtry, Some(tuned));
    for method in [Method::DownSampling, Method::UpSampling, Method::BalancedBootstrap] {
        let row = outcome.table.get(method).unwrap().row().unwrap();
        assert_eq!(row.mtry, Some(tuned), "{method}");
    }
}

#[test]
fn smote_with_default_k_fails_alone() {
    // Eight training minority records cannot supply eight neighbours each.
    let outcome = run_comparison(&config(), &fertility_like()).unwrap();
    match outcome.table.get(Method::Smote).unwrap() {
        BranchOutcome::Failed { reason, .. } => assert!(reason.contains("k = 8"), "{reason}"),
        BranchOutcome::Completed(_) => panic!("SMOTE should fail with k = 8"),
    }
    assert_eq!(outcome.table.n_failed(), 1);
    assert!(outcome.table.to_string().contains("SMOTE                FAILED ("));
}

#[test]
fn smote_with_smaller_k_rebalances() {
    let config = config().with_smote(Smote::new(5).unwrap());
    let outcome = run_comparison(&config, &fertility_like()).unwrap();
    let row = outcome.table.get(Method::Smote).unwrap().row().unwrap();
    assert_eq!(row.train_counts.abnormal, 24);
    assert_eq!(row.train_counts.normal, 32);
}

#[test]
fn mtry_beyond_feature_count_fails_every_forest_branch() {
    let config = ExperimentConfig::new()
        .with_params(small_forest().with_mtry(10))
        .with_search(MtrySearch::Grid(vec![10]));
    let outcome = run_comparison(&config, &fertility_like()).unwrap();
    assert!(outcome.tuned_mtry.is_none());
    for outcome in outcome.table.rows() {
        match outcome {
            BranchOutcome::Failed { reason, method } if *method != Method::Smote => {
                assert!(reason.contains("max_features resolved to 10"), "{reason}");
            }
            BranchOutcome::Failed { .. } => {}
            BranchOutcome::Completed(row) => panic!("{} should have failed", row.method),
        }
    }
}

#[test]
fn undetected_minority_reports_zero_sensitivity() {
    // Constant features leave every tree a single leaf voting the majority.
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..100 {
        rows.push(vec![0.0; 9]);
        labels.push(if i < 88 { Label::Normal } else { Label::Abnormal });
    }
    let table = LabeledTable::new(columns(), rows, labels).unwrap();
    let outcome = run_comparison(&config(), &table).unwrap();

    let row = outcome.table.get(Method::Imbalanced).unwrap().row().unwrap();
    assert_eq!(row.confusion.true_positive, 0);
    assert_eq!(row.confusion.false_negative, 4);
    assert_eq!(row.sensitivity, Rate::Defined(0.0));
    assert_eq!(row.specificity, Rate::Defined(1.0));
    assert!(!row.warnings.is_empty());

    let rendered = outcome.table.to_string();
    let line = rendered.lines().find(|l| l.starts_with("Imbalanced")).unwrap();
    assert!(line.contains("0.0000!"), "{line}");
    assert!(rendered.contains("! Imbalanced: sensitivity is 0"));

    let json = serde_json::to_value(&outcome.table).unwrap();
    assert_eq!(json[0]["status"], "completed");
    assert_eq!(json[0]["sensitivity"], 0.0);
}

#[test]
fn tree_mode_still_runs_balanced_bootstrap_as_forest() {
    let config = config().with_model(ModelKind::Tree);
    let outcome = run_comparison(&config, &fertility_like()).unwrap();
    let imbalanced = outcome.table.get(Method::Imbalanced).unwrap().row().unwrap();
    assert_eq!(imbalanced.model, ModelKind::Tree);
    assert!(imbalanced.mtry.is_none());
    assert!(outcome.tuned_mtry.is_none());
    let balanced = outcome.table.get(Method::BalancedBootstrap).unwrap().row().unwrap();
    assert_eq!(balanced.model, ModelKind::Forest);
    assert_eq!(balanced.mtry, Some(3));
}

#[test]
fn same_seed_same_table() {
    let a = run_comparison(&config(), &fertility_like()).unwrap();
    let b = run_comparison(&config(), &fertility_like()).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    let c = run_comparison(&config().with_seed(12), &fertility_like()).unwrap();
    assert_ne!(a.seeds, c.seeds);
}
