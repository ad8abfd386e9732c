//! Orchestration of a benchmark run
//!
//! Every collaborator runs as its own tokio task and talks to the others
//! only through the command bus and byte queues, the way separate processes
//! would:
//!
//! - data generators send data messages to the SUT and select tasks to the
//!   task generators
//! - task generators send queries to the SUT and expected answers to the
//!   evaluation storage
//! - the SUT adapter sends answers to the evaluation storage

pub mod bus;
pub mod commands;
pub mod controller;
pub mod data_generator;
pub mod evaluation_storage;
pub mod messages;
pub mod metrics;
pub mod system_adapter;
pub mod task_generator;

pub use bus::{CommandBus, CountedBarrier};
pub use commands::{Command, CommandMessage};
pub use controller::Controller;
pub use data_generator::DataGenerator;
pub use evaluation_storage::EvaluationStorage;
pub use system_adapter::SystemAdapter;
pub use task_generator::TaskGenerator;

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::evaluation::Summary;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Wall clock in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Run a whole benchmark in-process and return its evaluation summary.
///
/// The first component that fails aborts the run with its error.
pub async fn run_benchmark(config: ControllerConfig) -> Result<Summary> {
    config.validate()?;
    let bus = CommandBus::new();

    let (data_tx, data_rx) = mpsc::unbounded_channel();
    let (select_tx, select_rx) = mpsc::unbounded_channel();
    let (sut_task_tx, sut_task_rx) = mpsc::unbounded_channel();
    let (expected_tx, expected_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();

    // Every subscription exists before the controller publishes anything
    let controller = Controller::new(config.clone(), bus.clone());
    let adapter = SystemAdapter::new(config.data_generators, bus.clone(), data_rx, sut_task_rx, response_tx)?;
    let storage = EvaluationStorage::new(bus.clone(), expected_rx, response_rx);
    let generators: Vec<DataGenerator> = (1..=config.data_generators)
        .map(|id| {
            DataGenerator::new(
                id,
                config.generator.clone(),
                bus.clone(),
                data_tx.clone(),
                select_tx.clone(),
                config.barrier_timeout,
            )
        })
        .collect();
    drop(data_tx);
    drop(select_tx);

    let shared_selects = Arc::new(Mutex::new(select_rx));
    let next_task_id = Arc::new(AtomicU64::new(1));
    let relays: Vec<TaskGenerator> = (1..=config.task_generators)
        .map(|id| {
            TaskGenerator::new(
                id,
                bus.clone(),
                Arc::clone(&shared_selects),
                Arc::clone(&next_task_id),
                sut_task_tx.clone(),
                expected_tx.clone(),
            )
        })
        .collect();
    drop(sut_task_tx);
    drop(expected_tx);

    let mut components: FuturesUnordered<JoinHandle<Result<&'static str>>> = FuturesUnordered::new();
    components.push(tokio::spawn(async move { adapter.run().await.map(|()| "system adapter") }));
    components.push(tokio::spawn(async move { storage.run().await.map(|_| "evaluation storage") }));
    for generator in generators {
        components.push(tokio::spawn(async move { generator.run().await.map(|_| "data generator") }));
    }
    for relay in relays {
        components.push(tokio::spawn(async move { relay.run().await.map(|_| "task generator") }));
    }

    let run = controller.run();
    tokio::pin!(run);
    loop {
        tokio::select! {
            summary = &mut run => {
                for component in components.iter() {
                    component.abort();
                }
                return summary;
            }
            Some(finished) = components.next(), if !components.is_empty() => match finished {
                Ok(Ok(name)) => log::debug!("{} finished", name),
                Ok(Err(e)) => {
                    log::error!("Component failed, aborting the run: {}", e);
                    for component in components.iter() {
                        component.abort();
                    }
                    return Err(e);
                }
                Err(e) => {
                    for component in components.iter() {
                        component.abort();
                    }
                    return Err(Error::DispatchFailure(format!("component task failed: {}", e)));
                }
            },
        }
    }
}
