use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use rebalance_data::{ClassCounts, Label, Smote};
use rebalance_eval::{ExperimentConfig, Hyperparameters, ModelKind, MtrySearch, run_comparison};
use rebalance_io::{ExperimentName, FertilityReader, ReportWriter};

#[derive(Parser)]
#[command(name = "rebalance")]
#[command(about = "Compare class-rebalancing strategies for tree and forest classifiers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Master RNG seed; every branch seed is derived from it
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input file options shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the fertility CSV file
    #[arg(long)]
    data: PathBuf,

    /// The file has no header row (raw UCI layout)
    #[arg(long, default_value_t = false)]
    no_header: bool,

    /// Fraction of each class placed in the training partition
    #[arg(long, default_value_t = 0.67)]
    train_fraction: f64,
}

/// Model and resampling parameters for a comparison run.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Classifier: "forest" or "tree"
    #[arg(long, default_value = "forest")]
    model: String,

    /// Features drawn at each forest split when not tuned
    #[arg(long, default_value_t = 3)]
    mtry: usize,

    /// Trees per forest
    #[arg(long, default_value_t = 1000)]
    n_trees: usize,

    /// Minimum samples a node needs before a split is attempted
    #[arg(long, default_value_t = 1)]
    min_split: usize,

    /// Minimum samples in each leaf
    #[arg(long, default_value_t = 1)]
    min_node_size: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 10)]
    folds: usize,

    /// mtry search of the k-fold branch: "grid" or "random"
    #[arg(long, default_value = "grid")]
    search: String,

    /// Candidates drawn by the random mtry search
    #[arg(long, default_value_t = 3)]
    search_candidates: usize,

    /// SMOTE nearest-neighbour count
    #[arg(long, default_value_t = 8)]
    smote_k: usize,

    /// SMOTE over-sampling percentage
    #[arg(long, default_value_t = 200)]
    smote_over: u32,

    /// SMOTE majority under-sampling percentage
    #[arg(long, default_value_t = 200)]
    smote_under: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Report the class distribution of the dataset and its stratified split
    Explore {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Run all six rebalancing methods and compare their metrics
    Compare {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ExploreOutput {
    n_records: usize,
    n_features: usize,
    dataset: DistributionOutput,
    train: DistributionOutput,
    test: DistributionOutput,
}

#[derive(Serialize)]
struct DistributionOutput {
    counts: ClassCounts,
    normal_proportion: f64,
    abnormal_proportion: f64,
    imbalance_ratio: f64,
}

impl From<ClassCounts> for DistributionOutput {
    fn from(counts: ClassCounts) -> Self {
        Self {
            counts,
            normal_proportion: counts.proportion(Label::Normal),
            abnormal_proportion: counts.proportion(Label::Abnormal),
            imbalance_ratio: counts.imbalance_ratio(),
        }
    }
}

fn parse_model(s: &str) -> Result<ModelKind> {
    match s {
        "forest" => Ok(ModelKind::Forest),
        "tree" => Ok(ModelKind::Tree),
        other => anyhow::bail!("unknown model: {other} (expected forest or tree)"),
    }
}

fn parse_search(s: &str, n_candidates: usize) -> Result<MtrySearch> {
    match s {
        "grid" => Ok(MtrySearch::FullGrid),
        "random" => Ok(MtrySearch::Random { n_candidates }),
        other => anyhow::bail!("unknown mtry search: {other} (expected grid or random)"),
    }
}

fn read_dataset(input: &InputArgs) -> Result<rebalance_data::LabeledTable> {
    FertilityReader::new(&input.data)
        .with_header(!input.no_header)
        .read()
        .with_context(|| format!("failed to read dataset {}", input.data.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Explore { input } => {
            let dataset = read_dataset(&input)?;
            let split = ExperimentConfig::new()
                .with_train_fraction(input.train_fraction)
                .with_seed(cli.seed)
                .partition(&dataset)
                .context("stratified split failed")?;

            let output = ExploreOutput {
                n_records: dataset.n_records(),
                n_features: dataset.n_features(),
                dataset: dataset.class_counts().into(),
                train: split.train().class_counts().into(),
                test: split.test().class_counts().into(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Compare {
            input,
            model,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment)?;
            let dataset = read_dataset(&input)?;

            let params = Hyperparameters {
                mtry: model.mtry,
                n_trees: model.n_trees,
                min_node_size: model.min_node_size,
                min_split_size: model.min_split,
                max_depth: model.max_depth,
            };
            let smote = Smote::new(model.smote_k)?
                .with_perc_over(model.smote_over)
                .with_perc_under(model.smote_under);
            let config = ExperimentConfig::new()
                .with_train_fraction(input.train_fraction)
                .with_n_folds(model.folds)
                .with_model(parse_model(&model.model)?)
                .with_params(params)
                .with_smote(smote)
                .with_search(parse_search(&model.search, model.search_candidates)?)
                .with_seed(cli.seed);

            let outcome = run_comparison(&config, &dataset).context("comparison failed")?;

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            let path = writer.write_comparison(&config, &outcome)?;
            info!(path = %path.display(), n_failed = outcome.table.n_failed(), "report written");

            println!(
                "dataset {} | train {} | test {}",
                outcome.dataset_counts, outcome.train_counts, outcome.test_counts
            );
            if let Some(mtry) = outcome.tuned_mtry {
                println!("tuned mtry: {mtry}");
            }
            println!();
            print!("{}", outcome.table);
        }
    }

    Ok(())
}
