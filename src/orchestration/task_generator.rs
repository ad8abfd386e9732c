//! Task relay between data generators, the SUT and evaluation storage.

use crate::error::{Error, Result};
use crate::evaluation::ExpectedAnswer;
use crate::orchestration::bus::CommandBus;
use crate::orchestration::commands::Command;
use crate::orchestration::messages::{EvaluationTask, SelectTask, SutTask};
use crate::orchestration::now_millis;
use crate::querying::bindings::SparqlJsonResults;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Queue shared by every task generator; each task is taken once.
pub type SharedTaskQueue = Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

pub struct TaskGenerator {
    id: usize,
    bus: CommandBus,
    incoming: SharedTaskQueue,
    next_task_id: Arc<AtomicU64>,
    sut: mpsc::UnboundedSender<Vec<u8>>,
    storage: mpsc::UnboundedSender<Vec<u8>>,
}

impl TaskGenerator {
    pub fn new(
        id: usize,
        bus: CommandBus,
        incoming: SharedTaskQueue,
        next_task_id: Arc<AtomicU64>,
        sut: mpsc::UnboundedSender<Vec<u8>>,
        storage: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self { id, bus, incoming, next_task_id, sut, storage }
    }

    /// Relay tasks until every data generator is gone. Returns the number
    /// of tasks relayed.
    pub async fn run(self) -> Result<u64> {
        let mut relayed = 0u64;
        loop {
            let next = { self.incoming.lock().await.recv().await };
            let Some(bytes) = next else { break };
            match self.relay(&bytes) {
                Ok(task_id) => {
                    relayed += 1;
                    log::debug!("Task generator {}: relayed task {}", self.id, task_id);
                }
                Err(e) => log::warn!("Task generator {}: task dropped: {}", self.id, e),
            }
        }

        log::info!("Task generator {} is done after {} task(s)", self.id, relayed);
        drop(self.sut);
        drop(self.storage);
        self.bus.signal(Command::TaskGeneratorFinished)?;
        Ok(relayed)
    }

    fn relay(&self, bytes: &[u8]) -> Result<u64> {
        let task = SelectTask::decode(bytes)?;
        let results = SparqlJsonResults::from_slice(task.expected.as_bytes())?;
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);

        let sent_at = now_millis();
        self.sut
            .send(SutTask { task_id, query: task.query }.encode())
            .map_err(|_| Error::DispatchFailure(format!("task {}: SUT queue closed", task_id)))?;

        let expected = EvaluationTask {
            task_id,
            expected: ExpectedAnswer {
                model_size: task.model_size,
                begin_point: task.begin_point,
                sent_at,
                results,
            },
        };
        self.storage.send(expected.encode()?).map_err(|_| {
            Error::DispatchFailure(format!("task {}: evaluation storage queue closed", task_id))
        })?;
        Ok(task_id)
    }
}
