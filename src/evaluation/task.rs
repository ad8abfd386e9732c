use crate::querying::bindings::Binding;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scores of one verification query. Never changed once computed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskEvaluation {
    pub task_id: u64,
    pub recall: f64,
    pub precision: f64,
    pub f_measure: f64,
    /// Statements per second over the stream interval
    pub tps: f64,
    /// Response delay in seconds
    pub delay: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub model_size: u64,
    pub begin_point: i64,
    pub sent_at: i64,
    pub received_at: i64,
}

impl TaskEvaluation {
    /// Compare `observed` against `reference`. A reference binding is found
    /// when `observed` holds it at least once; any further observed row is a
    /// false positive.
    ///
    /// Timestamps are epoch milliseconds; `begin_point` is when the stream's
    /// first insert went out and `sent_at` when its query did.
    pub fn score(
        reference: &[Binding],
        observed: &[Binding],
        model_size: u64,
        begin_point: i64,
        sent_at: i64,
        received_at: i64,
    ) -> Self {
        let answered: HashSet<&Binding> = observed.iter().collect();

        let true_positives = reference.iter().filter(|b| answered.contains(b)).count();
        let false_negatives = reference.len() - true_positives;
        // Every observed row counts, repeated rows included
        let false_positives = observed.len().saturating_sub(true_positives);

        let recall = ratio(true_positives as f64, (true_positives + false_negatives) as f64);
        let precision = ratio(true_positives as f64, (true_positives + false_positives) as f64);
        let interval = stream_interval(begin_point, sent_at);

        Self {
            task_id: 0,
            recall,
            precision,
            f_measure: f_measure(recall, precision),
            tps: ratio(model_size as f64, interval),
            delay: (received_at - sent_at) as f64 / 1000.0,
            true_positives,
            false_positives,
            false_negatives,
            model_size,
            begin_point,
            sent_at,
            received_at,
        }
    }

    pub fn with_task_id(mut self, task_id: u64) -> Self {
        self.task_id = task_id;
        self
    }

    /// Seconds between the stream's first insert and its query
    pub fn interval(&self) -> f64 {
        stream_interval(self.begin_point, self.sent_at)
    }
}

fn stream_interval(begin_point: i64, sent_at: i64) -> f64 {
    (sent_at - begin_point) as f64 / 1000.0
}

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Harmonic mean of recall and precision; 0 when both are 0.
pub(crate) fn f_measure(recall: f64, precision: f64) -> f64 {
    ratio(2.0 * recall * precision, recall + precision)
}
