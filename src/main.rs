use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use ironknn::{ExecMode, KnnConfig, MalformedPolicy, Reduction, run_knn, write_report};

/// IronKnn - k nearest neighbours of a query point
#[derive(Parser, Debug)]
#[command(name = "ironknn", version, about)]
struct Cli {
    /// File, directory or glob pattern of `identifier,x,y` records
    #[arg(value_name = "POINTS", required_unless_present = "config")]
    points: Option<String>,

    /// X coordinate of the query point
    #[arg(value_name = "QUERY_X", required_unless_present = "config", allow_negative_numbers = true)]
    query_x: Option<f64>,

    /// Y coordinate of the query point
    #[arg(value_name = "QUERY_Y", required_unless_present = "config", allow_negative_numbers = true)]
    query_y: Option<f64>,

    /// Number of neighbours to return
    #[arg(value_name = "K", required_unless_present = "config", allow_negative_numbers = true)]
    k: Option<i64>,

    /// Output directory; the report is written to `part-r-00000` inside it
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Read the run configuration from a JSON file. Positional arguments
    /// given alongside it override the file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run every stage on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Worker threads for parallel execution
    #[arg(long, conflicts_with = "sequential")]
    threads: Option<usize>,

    /// Partitions the input is split into for parallel execution
    #[arg(long, conflicts_with = "sequential")]
    partitions: Option<usize>,

    /// How the nearest-k reduction is distributed
    #[arg(long, value_enum)]
    reduction: Option<Reduction>,

    /// Log and skip malformed records instead of aborting
    #[arg(long)]
    skip_malformed: bool,

    /// Print the report instead of writing it to OUTPUT
    #[arg(long)]
    stdout: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<KnnConfig> {
    let mut config = match &cli.config {
        Some(path) => KnnConfig::from_json_file(path)?,
        None => KnnConfig::new(
            cli.points.clone().context("POINTS is required without --config")?,
            cli.query_x.context("QUERY_X is required without --config")?,
            cli.query_y.context("QUERY_Y is required without --config")?,
            cli.k.context("K is required without --config")?,
        ),
    };

    if let Some(points) = &cli.points {
        config.points_source = points.clone();
    }
    if let Some(x) = cli.query_x {
        config.query_x = x;
    }
    if let Some(y) = cli.query_y {
        config.query_y = y;
    }
    if let Some(k) = cli.k {
        config.k = k;
    }
    if let Some(output) = &cli.output {
        config.output_destination = output.clone();
    }

    if cli.sequential {
        config.exec = ExecMode::Sequential;
    } else if cli.threads.is_some() || cli.partitions.is_some() {
        config.exec = ExecMode::Parallel {
            threads: cli.threads,
            partitions: cli.partitions,
        };
    }
    if let Some(reduction) = cli.reduction {
        config.reduction = reduction;
    }
    if cli.skip_malformed {
        config.on_malformed = MalformedPolicy::Skip;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    let run = run_knn(&config)?;
    info!(
        "{} record(s), {} skipped, {} distinct identifier(s)",
        run.stats.records, run.stats.malformed_skipped, run.stats.distinct_ids
    );

    if cli.stdout {
        print!("{}", run.report);
    } else {
        let path = write_report(&config.output_destination, &run.report)?;
        info!("report written to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
