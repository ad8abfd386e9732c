//! Pairs reference answers with SUT answers and scores them.

use crate::error::Result;
use crate::evaluation::{Evaluator, ExpectedAnswer, Summary};
use crate::orchestration::bus::CommandBus;
use crate::orchestration::commands::Command;
use crate::orchestration::messages::{EvaluationTask, SutResponse};
use crate::orchestration::now_millis;
use std::collections::HashMap;
use tokio::sync::mpsc;

pub struct EvaluationStorage {
    bus: CommandBus,
    expected: mpsc::UnboundedReceiver<Vec<u8>>,
    responses: mpsc::UnboundedReceiver<Vec<u8>>,
    evaluator: Evaluator,
    waiting_for_response: HashMap<u64, ExpectedAnswer>,
    /// Answers that overtook their expected answer, with receive time
    waiting_for_expected: HashMap<u64, (Vec<u8>, i64)>,
}

impl EvaluationStorage {
    pub fn new(
        bus: CommandBus,
        expected: mpsc::UnboundedReceiver<Vec<u8>>,
        responses: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            bus,
            expected,
            responses,
            evaluator: Evaluator::new(),
            waiting_for_response: HashMap::new(),
            waiting_for_expected: HashMap::new(),
        }
    }

    /// Collect until the relay and the SUT are done, then summarize and
    /// publish the summary.
    pub async fn run(mut self) -> Result<Summary> {
        let mut expected_open = true;
        let mut responses_open = true;

        while expected_open || responses_open {
            tokio::select! {
                message = self.expected.recv(), if expected_open => match message {
                    Some(bytes) => self.on_expected(&bytes),
                    None => expected_open = false,
                },
                message = self.responses.recv(), if responses_open => match message {
                    Some(bytes) => self.on_response(&bytes, now_millis()),
                    None => responses_open = false,
                },
            }
        }

        let unanswered: Vec<(u64, ExpectedAnswer)> = self.waiting_for_response.drain().collect();
        let now = now_millis();
        for (task_id, expected) in unanswered {
            self.evaluator.evaluate_response(task_id, &expected, &[], now);
        }
        if !self.waiting_for_expected.is_empty() {
            log::warn!(
                "Evaluation storage: {} answer(s) for unknown tasks dropped",
                self.waiting_for_expected.len()
            );
        }

        let summary = self.evaluator.summarize();
        log::info!(
            "Evaluation over {} task(s): micro recall {:.3}, micro precision {:.3}, max TPS {:.1}, average TPS {:.1}, average delay {:.3}s",
            summary.task_count,
            summary.micro_recall,
            summary.micro_precision,
            summary.max_tps,
            summary.average_tps,
            summary.average_task_delay
        );
        self.bus.publish(Command::EvaluationFinished, serde_json::to_vec(&summary)?)?;
        Ok(summary)
    }

    fn on_expected(&mut self, bytes: &[u8]) {
        let task = match EvaluationTask::decode(bytes) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("Evaluation storage: unreadable expected answer: {}", e);
                return;
            }
        };
        match self.waiting_for_expected.remove(&task.task_id) {
            Some((body, received_at)) => {
                self.evaluator.evaluate_response(task.task_id, &task.expected, &body, received_at);
            }
            None => {
                self.waiting_for_response.insert(task.task_id, task.expected);
            }
        }
    }

    fn on_response(&mut self, bytes: &[u8], received_at: i64) {
        let response = match SutResponse::decode(bytes) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Evaluation storage: unreadable response: {}", e);
                return;
            }
        };
        match self.waiting_for_response.remove(&response.task_id) {
            Some(expected) => {
                self.evaluator.evaluate_response(response.task_id, &expected, &response.body, received_at);
            }
            None => {
                self.waiting_for_expected.insert(response.task_id, (response.body, received_at));
            }
        }
    }
}
