//! Evaluation Tests
//!
//! These tests verify per-task scoring and run summaries:
//! - recall, precision and F-measure on binding sets
//! - the zero-denominator policy
//! - micro and macro averages, TPS and delay aggregation
//! - scoring raw SPARQL JSON answers

use odin::config::EvaluatorConfig;
use odin::evaluation::{Evaluator, ExpectedAnswer, Summary, TaskEvaluation};
use odin::querying::{Binding, SparqlJsonResults};

fn x(values: &[&str]) -> Vec<Binding> {
    values.iter().map(|v| Binding::from_pairs(&[("x", v)])).collect()
}

fn json_answer(values: &[&str]) -> Vec<u8> {
    let rows: Vec<String> = values
        .iter()
        .map(|v| format!(r#"{{"x":{{"type":"uri","value":"{}"}}}}"#, v))
        .collect();
    format!(r#"{{"head":{{"vars":["x"]}},"results":{{"bindings":[{}]}}}}"#, rows.join(",")).into_bytes()
}

#[test]
fn test_half_right_answer() {
    let task = TaskEvaluation::score(&x(&["a", "b"]), &x(&["a", "c"]), 4, 0, 2000, 2250);

    assert_eq!(task.true_positives, 1);
    assert_eq!(task.false_negatives, 1);
    assert_eq!(task.false_positives, 1);
    assert_eq!(task.recall, 0.5);
    assert_eq!(task.precision, 0.5);
    assert_eq!(task.f_measure, 0.5);
    assert_eq!(task.tps, 2.0);
    assert_eq!(task.delay, 0.25);
}

#[test]
fn test_perfect_answer() {
    let reference = x(&["a", "b", "c"]);
    let task = TaskEvaluation::score(&reference, &reference, 3, 0, 1000, 1000);
    assert_eq!((task.recall, task.precision, task.f_measure), (1.0, 1.0, 1.0));
    assert_eq!(task.delay, 0.0);
}

#[test]
fn test_order_of_bindings_does_not_matter() {
    let task = TaskEvaluation::score(&x(&["a", "b"]), &x(&["b", "a"]), 1, 0, 1000, 1000);
    assert_eq!(task.recall, 1.0);
    assert_eq!(task.precision, 1.0);
}

#[test]
fn test_repeated_observed_row_lowers_precision() {
    let task = TaskEvaluation::score(&x(&["a"]), &x(&["a", "a"]), 1, 0, 1000, 1000);
    assert_eq!(task.true_positives, 1);
    assert_eq!(task.false_positives, 1);
    assert_eq!(task.recall, 1.0);
    assert_eq!(task.precision, 0.5);
}

#[test]
fn test_zero_denominators_score_zero() {
    let empty = TaskEvaluation::score(&[], &[], 1, 0, 1000, 1000);
    assert_eq!(empty.recall, 0.0);
    assert_eq!(empty.precision, 0.0);
    assert_eq!(empty.f_measure, 0.0);
    assert!(!empty.recall.is_nan());

    let nothing_observed = TaskEvaluation::score(&x(&["a"]), &[], 1, 0, 1000, 1000);
    assert_eq!(nothing_observed.recall, 0.0);
    assert_eq!(nothing_observed.precision, 0.0);

    let zero_interval = TaskEvaluation::score(&x(&["a"]), &x(&["a"]), 10, 1000, 1000, 1000);
    assert_eq!(zero_interval.tps, 0.0);
}

#[test]
fn test_summary_of_no_tasks_is_zero() {
    let summary = Evaluator::new().summarize();
    assert_eq!(summary, Summary::default());
    assert!(!summary.micro_f_measure.is_nan());
}

#[test]
fn test_summary_aggregates() {
    let mut evaluator = Evaluator::new();
    // Fully correct, 10 statements over 2s
    evaluator.evaluate_pair(1, &x(&["a", "b"]), &x(&["a", "b"]), 10, 0, 2000, 2500);
    // Half right, 30 statements over 1s
    evaluator.evaluate_pair(2, &x(&["a", "b"]), &x(&["a", "c"]), 30, 2000, 3000, 4500);
    let summary = evaluator.summarize();

    assert_eq!(summary.task_count, 2);
    // 3 of 4 reference bindings found, 3 of 4 observed correct
    assert_eq!(summary.micro_recall, 0.75);
    assert_eq!(summary.micro_precision, 0.75);
    assert_eq!(summary.micro_f_measure, 0.75);
    assert_eq!(summary.macro_recall, 0.75);
    assert_eq!(summary.macro_precision, 0.75);
    // Only the fully correct task counts towards max TPS
    assert_eq!(summary.max_tps, 5.0);
    assert!((summary.average_tps - 40.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.average_task_delay, 1.0);
}

#[test]
fn test_response_scored_from_json() {
    let expected = ExpectedAnswer {
        model_size: 6,
        begin_point: 1000,
        sent_at: 4000,
        results: SparqlJsonResults::from_slice(&json_answer(&["http://e/a", "http://e/b"])).unwrap(),
    };
    let mut evaluator = Evaluator::new();
    let task = evaluator.evaluate_response(9, &expected, &json_answer(&["http://e/a"]), 4100).clone();

    assert_eq!(task.task_id, 9);
    assert_eq!(task.recall, 0.5);
    assert_eq!(task.precision, 1.0);
    assert_eq!(task.tps, 2.0);
    assert!((task.delay - 0.1).abs() < 1e-9);
}

#[test]
fn test_unreadable_response_scores_empty() {
    let expected = ExpectedAnswer {
        model_size: 1,
        begin_point: 0,
        sent_at: 1000,
        results: SparqlJsonResults::from_slice(&json_answer(&["http://e/a"])).unwrap(),
    };
    let mut evaluator = Evaluator::new();
    let task = evaluator.evaluate_response(1, &expected, b"not json", 1000);
    assert_eq!(task.recall, 0.0);
    assert_eq!(task.false_negatives, 1);
}

#[test]
fn test_report_contains_every_label() {
    let mut evaluator = Evaluator::new();
    evaluator.evaluate_pair(1, &x(&["a"]), &x(&["a"]), 1, 0, 1000, 1200);
    let labels = EvaluatorConfig::default();
    let report = evaluator.summarize().to_report(&labels);

    for label in [
        &labels.average_task_delay,
        &labels.micro_average_recall,
        &labels.micro_average_precision,
        &labels.micro_average_fmeasure,
        &labels.macro_average_recall,
        &labels.macro_average_precision,
        &labels.macro_average_fmeasure,
        &labels.max_tps,
        &labels.average_tps,
        &labels.tasks_recall,
        &labels.tasks_precision,
        &labels.tasks_fmeasure,
        &labels.tasks_tps,
        &labels.tasks_delay,
    ] {
        assert!(report.get(label.as_str()).is_some(), "missing {}", label);
    }
    assert_eq!(report[&labels.tasks_delay][0]["value"], serde_json::json!(0.2));
}

#[test]
fn test_summary_survives_json() {
    let mut evaluator = Evaluator::new();
    evaluator.evaluate_pair(1, &x(&["a"]), &x(&["a"]), 3, 0, 1000, 1500);
    evaluator.evaluate_pair(2, &x(&["a"]), &x(&["b"]), 3, 0, 2000, 2500);
    let summary = evaluator.summarize();
    let decoded: Summary = serde_json::from_slice(&serde_json::to_vec(&summary).unwrap()).unwrap();
    assert_eq!(decoded, summary);
}
