//! ODIN command-line interface
//!
//! Usage:
//!   odin mimic --dataset TWIG --seed 100 --population 1000 --output data/twig
//!   odin partition --dataset TWIG --input data/twig --work-dir data/twig_run
//!   odin build --id 1 --dataset TWIG --seed 100 --population 1000 \
//!       --output output_data --inserts-per-stream 10 --duration 600000
//!   odin run --data-generators 2 --task-generators 1 --default-labels ...
//!
//! Generator parameters have no defaults; each falls back to its
//! `generator_*` environment variable. `run` names its report fields after
//! the `evaluation_*` variables unless `--default-labels` is given.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use odin::config::{ControllerConfig, EvaluatorConfig, GeneratorConfig};
use odin::core::Bounds;
use odin::dataset::{DatasetKind, Partitioner};
use odin::mimicking::SyntheticSource;
use odin::orchestration::data_generator::prepare;
use odin::orchestration::run_benchmark;
use odin::stream::StreamBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Parser, Debug)]
#[command(name = "odin")]
#[command(about = "ODIN - Streaming benchmark harness for triple stores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a synthetic dataset
    Mimic {
        #[arg(long, env = "generator_dataset")]
        dataset: DatasetKind,

        #[arg(long, env = "generator_seed")]
        seed: u64,

        #[arg(long, env = "generator_population")]
        population: usize,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a dataset into one file per event timestamp
    Partition {
        #[arg(long, env = "generator_dataset")]
        dataset: DatasetKind,

        /// Directory with the source files
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving the buckets and the manifest
        #[arg(short, long)]
        work_dir: PathBuf,
    },

    /// Prepare the streams of one data generator offline
    Build {
        /// Generator instance id
        #[arg(long, default_value = "1")]
        id: usize,

        #[command(flatten)]
        generator: GeneratorArgs,
    },

    /// Run a whole benchmark against the in-process system adapter
    Run {
        #[arg(long, default_value = "2")]
        data_generators: usize,

        #[arg(long, default_value = "1")]
        task_generators: usize,

        /// Rendezvous timeout in seconds
        #[arg(long, default_value = "600")]
        barrier_timeout: u64,

        /// Drain timeout in seconds
        #[arg(long, default_value = "7200")]
        drain_timeout: u64,

        /// Key the report by the built-in bench labels instead of the
        /// `evaluation_*` variables
        #[arg(long)]
        default_labels: bool,

        #[command(flatten)]
        generator: GeneratorArgs,
    },
}

#[derive(Args, Debug)]
struct GeneratorArgs {
    #[arg(long, env = "generator_dataset")]
    dataset: DatasetKind,

    #[arg(long, env = "generator_seed")]
    seed: u64,

    #[arg(long, env = "generator_population")]
    population: usize,

    #[arg(long, env = "generator_mimicking-output")]
    output: PathBuf,

    /// Inserts per stream
    #[arg(long, env = "generator_insert-queries-count")]
    inserts_per_stream: usize,

    /// Benchmark window in milliseconds
    #[arg(long, env = "generator_benchmark_duration")]
    duration: i64,
}

impl GeneratorArgs {
    fn into_config(self) -> odin::Result<GeneratorConfig> {
        let config = GeneratorConfig {
            seed: self.seed,
            population: self.population,
            dataset: self.dataset,
            output_dir: self.output,
            inserts_per_stream: self.inserts_per_stream,
            benchmark_duration: self.duration,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = execute(cli.command).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Mimic { dataset, seed, population, output } => {
            let written = SyntheticSource::new(dataset, seed, population).generate(&output)?;
            println!("Wrote {} data to {}", dataset, written.display());
        }
        Commands::Partition { dataset, input, work_dir } => {
            let partition = Partitioner::new(dataset, &work_dir)?
                .partition(&input)
                .with_context(|| format!("partitioning {}", input.display()))?;
            println!("{} timestamp bucket(s), manifest at {}", partition.len(), partition.manifest.display());
        }
        Commands::Build { id, generator } => {
            let config = generator.into_config()?;
            let buckets = prepare(&config, id)?;
            let local = match (buckets.keys().next(), buckets.keys().next_back()) {
                (Some(&min), Some(&max)) => Bounds::new(min, max),
                _ => anyhow::bail!("generator {} produced no timestamp buckets", id),
            };
            let streams = StreamBuilder::new(config.work_dir(id), config.graph_name(id), config.inserts_per_stream)
                .build_from_buckets(&buckets, local, config.benchmark_duration)?;
            let inserts: usize = streams.iter().map(|s| s.inserts.len()).sum();
            println!(
                "Built {} stream(s) with {} insert(s) in {}",
                streams.len(),
                inserts,
                config.work_dir(id).display()
            );
        }
        Commands::Run { data_generators, task_generators, barrier_timeout, drain_timeout, default_labels, generator } => {
            let config = ControllerConfig {
                data_generators,
                task_generators,
                generator: generator.into_config()?,
                barrier_timeout: Duration::from_secs(barrier_timeout),
                drain_timeout: Duration::from_secs(drain_timeout),
            };
            let labels = if default_labels {
                EvaluatorConfig::default()
            } else {
                EvaluatorConfig::from_env().context("resolving the evaluation labels")?
            };

            let interrupted = Arc::new(Notify::new());
            let notify = Arc::clone(&interrupted);
            ctrlc::set_handler(move || {
                eprintln!("\nReceived Ctrl+C, stopping...");
                notify.notify_one();
            })?;

            let summary = tokio::select! {
                summary = run_benchmark(config) => summary?,
                _ = interrupted.notified() => anyhow::bail!("benchmark interrupted"),
            };
            println!("{}", serde_json::to_string_pretty(&summary.to_report(&labels))?);
        }
    }

    Ok(())
}
