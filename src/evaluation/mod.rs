//! Evaluation of verification answers
//!
//! Each answer from the SUT is scored against the reference answer of its
//! task as soon as it arrives. The evaluator keeps the per-task scores in
//! send order and folds them into the run summary at the end.

pub mod task;

pub use task::TaskEvaluation;

use crate::config::EvaluatorConfig;
use crate::core::encoding::{write_byte_arrays, ByteReader};
use crate::error::Result;
use crate::querying::bindings::{Binding, SparqlJsonResults};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use task::{f_measure, ratio};

/// What the evaluator needs to know about a task before its answer arrives
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedAnswer {
    pub model_size: u64,
    pub begin_point: i64,
    pub sent_at: i64,
    pub results: SparqlJsonResults,
}

impl ExpectedAnswer {
    /// `(model size, begin point, sent timestamp, reference JSON)` as
    /// length-prefixed strings.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let model_size = self.model_size.to_string();
        let begin_point = self.begin_point.to_string();
        let sent_at = self.sent_at.to_string();
        let results = self.results.to_vec()?;
        Ok(write_byte_arrays(&[
            model_size.as_bytes(),
            begin_point.as_bytes(),
            sent_at.as_bytes(),
            &results,
        ]))
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buffer);
        let model_size = reader.read_i64()?.max(0) as u64;
        let begin_point = reader.read_i64()?;
        let sent_at = reader.read_i64()?;
        let results = SparqlJsonResults::from_slice(reader.read_bytes()?)?;
        Ok(Self { model_size, begin_point, sent_at, results })
    }
}

/// Aggregated KPIs of a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub task_count: usize,
    pub average_task_delay: f64,
    pub micro_recall: f64,
    pub micro_precision: f64,
    pub micro_f_measure: f64,
    pub macro_recall: f64,
    pub macro_precision: f64,
    pub macro_f_measure: f64,
    /// Best throughput among fully correct tasks
    pub max_tps: f64,
    pub average_tps: f64,
    pub tasks: Vec<TaskEvaluation>,
}

impl Summary {
    /// JSON report keyed by the configured KPI labels.
    pub fn to_report(&self, labels: &EvaluatorConfig) -> Value {
        let mut report = Map::new();
        let mut put = |label: &str, value: Value| {
            report.insert(label.to_string(), value);
        };

        put(&labels.average_task_delay, json!(self.average_task_delay));
        put(&labels.micro_average_recall, json!(self.micro_recall));
        put(&labels.micro_average_precision, json!(self.micro_precision));
        put(&labels.micro_average_fmeasure, json!(self.micro_f_measure));
        put(&labels.macro_average_recall, json!(self.macro_recall));
        put(&labels.macro_average_precision, json!(self.macro_precision));
        put(&labels.macro_average_fmeasure, json!(self.macro_f_measure));
        put(&labels.max_tps, json!(self.max_tps));
        put(&labels.average_tps, json!(self.average_tps));

        let series = |value: fn(&TaskEvaluation) -> f64| -> Value {
            self.tasks
                .iter()
                .map(|t| json!({ "task": t.task_id, "sentAt": t.sent_at, "value": value(t) }))
                .collect()
        };
        put(&labels.tasks_recall, series(|t| t.recall));
        put(&labels.tasks_precision, series(|t| t.precision));
        put(&labels.tasks_fmeasure, series(|t| t.f_measure));
        put(&labels.tasks_tps, series(|t| t.tps));
        put(&labels.tasks_delay, series(|t| t.delay));

        Value::Object(report)
    }
}

/// Accumulates task evaluations ordered by send time.
#[derive(Default)]
pub struct Evaluator {
    tasks: BTreeMap<(i64, u64), TaskEvaluation>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Score an answer received at `received_at`. `observed` is the raw
    /// SPARQL JSON sent by the SUT; a missing or unreadable answer scores
    /// as an empty result set.
    pub fn evaluate_response(
        &mut self,
        task_id: u64,
        expected: &ExpectedAnswer,
        observed: &[u8],
        received_at: i64,
    ) -> &TaskEvaluation {
        let observed = if observed.is_empty() {
            log::warn!("Task {}: no answer from the system, scoring as empty", task_id);
            Vec::new()
        } else {
            match SparqlJsonResults::from_slice(observed) {
                Ok(results) => results.bindings(),
                Err(e) => {
                    log::warn!("Task {}: unreadable answer ({}), scoring as empty", task_id, e);
                    Vec::new()
                }
            }
        };

        self.evaluate_pair(
            task_id,
            &expected.results.bindings(),
            &observed,
            expected.model_size,
            expected.begin_point,
            expected.sent_at,
            received_at,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_pair(
        &mut self,
        task_id: u64,
        reference: &[Binding],
        observed: &[Binding],
        model_size: u64,
        begin_point: i64,
        sent_at: i64,
        received_at: i64,
    ) -> &TaskEvaluation {
        let evaluation =
            TaskEvaluation::score(reference, observed, model_size, begin_point, sent_at, received_at)
                .with_task_id(task_id);
        log::debug!(
            "Task {}: recall {:.3}, precision {:.3}, tps {:.1}, delay {:.3}s",
            task_id,
            evaluation.recall,
            evaluation.precision,
            evaluation.tps,
            evaluation.delay
        );
        let entry = self.tasks.entry((sent_at, task_id)).or_insert(evaluation);
        &*entry
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskEvaluation> {
        self.tasks.values()
    }

    pub fn summarize(&self) -> Summary {
        let count = self.tasks.len();
        if count == 0 {
            return Summary::default();
        }
        let n = count as f64;

        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        let (mut recall_sum, mut precision_sum, mut delay_sum) = (0.0, 0.0, 0.0);
        let (mut model_sum, mut interval_sum) = (0.0, 0.0);
        let mut max_tps: f64 = 0.0;

        for task in self.tasks.values() {
            tp += task.true_positives;
            fp += task.false_positives;
            fn_ += task.false_negatives;
            recall_sum += task.recall;
            precision_sum += task.precision;
            delay_sum += task.delay;
            model_sum += task.model_size as f64;
            interval_sum += task.interval();
            if task.recall == 1.0 {
                max_tps = max_tps.max(task.tps);
            }
        }

        let micro_recall = ratio(tp as f64, (tp + fn_) as f64);
        let micro_precision = ratio(tp as f64, (tp + fp) as f64);
        let macro_recall = recall_sum / n;
        let macro_precision = precision_sum / n;

        Summary {
            task_count: count,
            average_task_delay: delay_sum / n,
            micro_recall,
            micro_precision,
            micro_f_measure: f_measure(micro_recall, micro_precision),
            macro_recall,
            macro_precision,
            macro_f_measure: f_measure(macro_recall, macro_precision),
            max_tps,
            average_tps: ratio(model_sum, interval_sum),
            tasks: self.tasks.values().cloned().collect(),
        }
    }
}
