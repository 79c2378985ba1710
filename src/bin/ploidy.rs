use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use ploidy_hmm::classify::{Classifier, DecisionTree, FeatureSet, TreeParams};
use ploidy_hmm::decode::label_column;
use ploidy_hmm::io::config::load_config;
use ploidy_hmm::io::table::{Table, read_reference, read_segments};
use ploidy_hmm::{
    DecodeConfig, ReferenceTable, decode_allelic_ratio, decode_joint, decode_read_count,
    decode_read_count_fixed_fraction, progress,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ModelArg {
    ReadCount,
    ReadCountFixed,
    AllelicRatio,
    Joint,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FeatureSetArg {
    TwoState,
    SevenState,
}

impl From<FeatureSetArg> for FeatureSet {
    fn from(v: FeatureSetArg) -> Self {
        match v {
            FeatureSetArg::TwoState => FeatureSet::TwoState,
            FeatureSetArg::SevenState => FeatureSet::SevenState,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ploidy", version)]
#[command(about = "Chromosomal-state decoding and condition classification of segment data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode per-segment states with a reference-parameterised HMM
    Decode(DecodeArgs),
    /// Fit a decision tree on a training table and label a test table
    Classify(ClassifyArgs),
}

#[derive(clap::Args, Debug)]
struct DecodeArgs {
    /// Segment table (TSV, optionally .gz) with sample, total_count, allelic_ratio
    segments: PathBuf,
    /// Output table; the input rows plus a `state` column
    output: PathBuf,
    #[arg(long, value_enum)]
    model: ModelArg,
    #[arg(long)]
    coverage: f64,
    #[arg(long, help = "Fetal fraction of the reference lookup (ignored by read-count-fixed)")]
    fetal_fraction: Option<f64>,
    #[arg(long)]
    read_count_ref: Option<PathBuf>,
    #[arg(long)]
    allelic_ratio_ref: Option<PathBuf>,
    #[arg(long, help = "JSON decode config")]
    config: Option<PathBuf>,
    #[arg(long, help = "Stay-switch ratio (overrides the config file)")]
    ssr: Option<f64>,
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long)]
    no_progress: bool,
}

#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    training: PathBuf,
    test: PathBuf,
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = FeatureSetArg::TwoState)]
    feature_set: FeatureSetArg,
    #[arg(long, default_value_t = 3)]
    max_depth: usize,
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Classify(args) => run_classify(args),
    }
}

fn load_reference(path: Option<&Path>, name: &str, flag: &str) -> Result<ReferenceTable> {
    let path = path.ok_or_else(|| anyhow!("--{flag} is required for this model"))?;
    read_reference(path, name).with_context(|| format!("failed to load {name} reference"))
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    if let Some(n_threads) = args.threads {
        if n_threads == 0 {
            bail!("--threads must be >= 1");
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build_global()
            .map_err(|e| anyhow!("failed to configure Rayon global thread pool: {e}"))?;
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => DecodeConfig::default(),
    };
    if let Some(ssr) = args.ssr {
        config.stay_switch_ratio = ssr;
    }
    config.progress = !args.no_progress;
    config.validate()?;

    let fetal_fraction = || {
        args.fetal_fraction
            .ok_or_else(|| anyhow!("--fetal-fraction is required for this model"))
    };

    let (table, rows) = if args.no_progress {
        read_segments(&args.segments)?
    } else {
        let pb = progress::spinner("IO", "Reading segments");
        let out = read_segments(&args.segments)?;
        pb.finish_with_message("Reading segments done");
        out
    };

    let rc_ref = args.read_count_ref.as_deref();
    let ar_ref = args.allelic_ratio_ref.as_deref();
    let decoded = match args.model {
        ModelArg::ReadCount => {
            let rc = load_reference(rc_ref, "read-count", "read-count-ref")?;
            decode_read_count(&rows, args.coverage, fetal_fraction()?, &rc, &config)?
        }
        ModelArg::ReadCountFixed => {
            if args.fetal_fraction.is_some() {
                log::warn!(
                    "--fetal-fraction is ignored by read-count-fixed (pinned to {})",
                    config.fixed_fetal_fraction
                );
            }
            let rc = load_reference(rc_ref, "read-count", "read-count-ref")?;
            decode_read_count_fixed_fraction(&rows, args.coverage, &rc, &config)?
        }
        ModelArg::AllelicRatio => {
            let ar = load_reference(ar_ref, "allelic-ratio", "allelic-ratio-ref")?;
            decode_allelic_ratio(&rows, args.coverage, fetal_fraction()?, &ar, &config)?
        }
        ModelArg::Joint => {
            let rc = load_reference(rc_ref, "read-count", "read-count-ref")?;
            let ar = load_reference(ar_ref, "allelic-ratio", "allelic-ratio-ref")?;
            decode_joint(&rows, args.coverage, fetal_fraction()?, &rc, &ar, &config)?
        }
    };

    let labels: Vec<Option<String>> = label_column(&decoded, rows.len())
        .into_iter()
        .map(|s| s.map(|v| v.to_string()))
        .collect();
    table.write_with_column(&args.output, "state", &labels)?;
    println!(
        "Decoded {} of {} rows: {}",
        decoded.len(),
        rows.len(),
        args.output.display()
    );
    Ok(())
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let set: FeatureSet = args.feature_set.into();
    let params = TreeParams {
        max_depth: args.max_depth,
        random_state: args.seed,
        ..TreeParams::default()
    };

    let training = Table::read(&args.training).context("failed to read training set")?;
    let x_train = training.feature_matrix(set.columns())?;
    let y_train = training.column_str(set.label())?;
    let tree = DecisionTree::fit(x_train.view(), &y_train, &params)?;

    let test = Table::read(&args.test).context("failed to read test set")?;
    let x_test = test.feature_matrix(set.columns())?;
    let predicted = tree.predict(x_test.view())?;

    let labels: Vec<Option<String>> = predicted.into_iter().map(Some).collect();
    test.write_with_column(&args.output, "prediction", &labels)?;
    println!("Predictions: {}", args.output.display());
    Ok(())
}
