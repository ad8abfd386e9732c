//! Configuration surfaces
//!
//! Generators and the evaluator read their parameters from environment
//! variables; the controller hands those variables to each generator it
//! starts. A missing or unreadable value is a [`Error::Config`], never a
//! silent default.

use crate::dataset::DatasetKind;
use crate::error::{Error, Result};
use oxigraph::model::NamedNode;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const GENERATOR_SEED: &str = "generator_seed";
pub const GENERATOR_POPULATION: &str = "generator_population";
pub const GENERATOR_DATASET: &str = "generator_dataset";
pub const GENERATOR_MIMICKING_OUTPUT: &str = "generator_mimicking-output";
pub const GENERATOR_INSERT_QUERIES_COUNT: &str = "generator_insert-queries-count";
pub const GENERATOR_BENCHMARK_DURATION: &str = "generator_benchmark_duration";

fn required<T, F>(lookup: &F, key: &str) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)
        .ok_or_else(|| Error::Config(format!("Couldn't get \"{}\" from the environment", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("Couldn't parse \"{}\" value {:?}", key, raw)))
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parameters of one data generator instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub population: usize,
    pub dataset: DatasetKind,
    pub output_dir: PathBuf,
    pub inserts_per_stream: usize,
    /// Benchmark window in milliseconds
    pub benchmark_duration: i64,
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dataset: String = required(&lookup, GENERATOR_DATASET)?;
        let output: String = required(&lookup, GENERATOR_MIMICKING_OUTPUT)?;
        let config = Self {
            seed: required(&lookup, GENERATOR_SEED)?,
            population: required(&lookup, GENERATOR_POPULATION)?,
            dataset: dataset.parse()?,
            output_dir: PathBuf::from(output),
            inserts_per_stream: required(&lookup, GENERATOR_INSERT_QUERIES_COUNT)?,
            benchmark_duration: required(&lookup, GENERATOR_BENCHMARK_DURATION)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inserts_per_stream == 0 {
            return Err(Error::Config(format!("\"{}\" must be at least 1", GENERATOR_INSERT_QUERIES_COUNT)));
        }
        if self.benchmark_duration <= 0 {
            return Err(Error::Config(format!("\"{}\" must be positive", GENERATOR_BENCHMARK_DURATION)));
        }
        Ok(())
    }

    /// Environment variables reproducing this configuration.
    pub fn to_env(&self) -> Vec<(String, String)> {
        vec![
            (GENERATOR_SEED.to_string(), self.seed.to_string()),
            (GENERATOR_POPULATION.to_string(), self.population.to_string()),
            (GENERATOR_DATASET.to_string(), self.dataset.to_string()),
            (GENERATOR_MIMICKING_OUTPUT.to_string(), self.output_dir.display().to_string()),
            (GENERATOR_INSERT_QUERIES_COUNT.to_string(), self.inserts_per_stream.to_string()),
            (GENERATOR_BENCHMARK_DURATION.to_string(), self.benchmark_duration.to_string()),
        ]
    }

    /// Seed of generator `generator_id`; every instance mimics other data.
    pub fn effective_seed(&self, generator_id: usize) -> u64 {
        self.seed.wrapping_add(generator_id as u64)
    }

    /// `<output>/<DATASET>_<population>_<inserts>/input_<seed>/`
    pub fn work_dir(&self, generator_id: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}_{}", self.dataset, self.population, self.inserts_per_stream))
            .join(format!("input_{}", self.effective_seed(generator_id)))
    }

    /// Target graph of generator `generator_id`
    pub fn graph_name(&self, generator_id: usize) -> NamedNode {
        NamedNode::new_unchecked(format!("http://www.graph{}.com/", generator_id))
    }
}

/// Parameters of a whole benchmark run
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub data_generators: usize,
    pub task_generators: usize,
    pub generator: GeneratorConfig,
    /// Bound on the bounds and bulk-load rendezvous
    pub barrier_timeout: Duration,
    /// Bound on waiting for every component to finish
    pub drain_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            data_generators: 2,
            task_generators: 1,
            generator: GeneratorConfig {
                seed: 100,
                population: 1000,
                dataset: DatasetKind::TransportData,
                output_dir: PathBuf::from("output_data"),
                inserts_per_stream: 10,
                benchmark_duration: 600_000,
            },
            barrier_timeout: Duration::from_secs(10 * 60),
            drain_timeout: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_generators == 0 {
            return Err(Error::Config("at least one data generator is required".to_string()));
        }
        if self.task_generators == 0 {
            return Err(Error::Config("at least one task generator is required".to_string()));
        }
        self.generator.validate()
    }

    /// Environment handed to every data generator
    pub fn generator_env(&self) -> Vec<(String, String)> {
        self.generator.to_env()
    }
}

pub const EVALUATION_AVERAGE_TASK_DELAY: &str = "evaluation_task-delay";
pub const EVALUATION_MICRO_AVERAGE_RECALL: &str = "evaluation_micro-average-recall";
pub const EVALUATION_MICRO_AVERAGE_PRECISION: &str = "evaluation_micro-average-precision";
pub const EVALUATION_MICRO_AVERAGE_FMEASURE: &str = "evaluation_micro-average-fmeasure";
pub const EVALUATION_MACRO_AVERAGE_RECALL: &str = "evaluation_macro-average-recall";
pub const EVALUATION_MACRO_AVERAGE_PRECISION: &str = "evaluation_macro-average-precision";
pub const EVALUATION_MACRO_AVERAGE_FMEASURE: &str = "evaluation_macro-average-fmeasure";
pub const EVALUATION_MAX_TPS: &str = "evaluation_max-tps";
pub const EVALUATION_AVERAGE_TPS: &str = "evaluation_average-tps";
pub const EVALUATION_TASKS_RECALL: &str = "evaluation_task-evaluation-recall";
pub const EVALUATION_TASKS_PRECISION: &str = "evaluation_task-evaluation-precision";
pub const EVALUATION_TASKS_FMEASURE: &str = "evaluation_task-evaluation-fmeasure";
pub const EVALUATION_TASKS_TPS: &str = "evaluation_task-evaluation-tps";
pub const EVALUATION_TASKS_DELAY: &str = "evaluation_task-evaluation-delay";

const BENCH: &str = "http://w3id.org/bench#";

/// Names of the fields of the evaluation report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluatorConfig {
    pub average_task_delay: String,
    pub micro_average_recall: String,
    pub micro_average_precision: String,
    pub micro_average_fmeasure: String,
    pub macro_average_recall: String,
    pub macro_average_precision: String,
    pub macro_average_fmeasure: String,
    pub max_tps: String,
    pub average_tps: String,
    pub tasks_recall: String,
    pub tasks_precision: String,
    pub tasks_fmeasure: String,
    pub tasks_tps: String,
    pub tasks_delay: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        let label = |name: &str| format!("{}{}", BENCH, name);
        Self {
            average_task_delay: label("averageTaskDelay"),
            micro_average_recall: label("microAverageRecall"),
            micro_average_precision: label("microAveragePrecision"),
            micro_average_fmeasure: label("microAverageFmeasure"),
            macro_average_recall: label("macroAverageRecall"),
            macro_average_precision: label("macroAveragePrecision"),
            macro_average_fmeasure: label("macroAverageFmeasure"),
            max_tps: label("maxTPS"),
            average_tps: label("averageTPS"),
            tasks_recall: label("tasksRecall"),
            tasks_precision: label("tasksPrecision"),
            tasks_fmeasure: label("tasksFmeasure"),
            tasks_tps: label("tasksTPS"),
            tasks_delay: label("tasksAnswerDelay"),
        }
    }
}

impl EvaluatorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            average_task_delay: required(&lookup, EVALUATION_AVERAGE_TASK_DELAY)?,
            micro_average_recall: required(&lookup, EVALUATION_MICRO_AVERAGE_RECALL)?,
            micro_average_precision: required(&lookup, EVALUATION_MICRO_AVERAGE_PRECISION)?,
            micro_average_fmeasure: required(&lookup, EVALUATION_MICRO_AVERAGE_FMEASURE)?,
            macro_average_recall: required(&lookup, EVALUATION_MACRO_AVERAGE_RECALL)?,
            macro_average_precision: required(&lookup, EVALUATION_MACRO_AVERAGE_PRECISION)?,
            macro_average_fmeasure: required(&lookup, EVALUATION_MACRO_AVERAGE_FMEASURE)?,
            max_tps: required(&lookup, EVALUATION_MAX_TPS)?,
            average_tps: required(&lookup, EVALUATION_AVERAGE_TPS)?,
            tasks_recall: required(&lookup, EVALUATION_TASKS_RECALL)?,
            tasks_precision: required(&lookup, EVALUATION_TASKS_PRECISION)?,
            tasks_fmeasure: required(&lookup, EVALUATION_TASKS_FMEASURE)?,
            tasks_tps: required(&lookup, EVALUATION_TASKS_TPS)?,
            tasks_delay: required(&lookup, EVALUATION_TASKS_DELAY)?,
        })
    }
}
