//! Benchmark controller
//!
//! Drives a run through its phases. A listener task turns incoming commands
//! into barrier signals; the controller itself only waits on barriers and
//! publishes the phase transitions:
//!
//! 1. collecting bounds: N local bounds, folded and broadcast
//! 2. bulk load: N generator acks, then one adapter ack, then continue
//! 3. streaming and drain: N data generators, M task generators and the SUT
//!    report completion
//! 4. evaluation: the evaluator reports its summary

use crate::config::ControllerConfig;
use crate::core::{decode_bounds, encode_bounds, Bounds};
use crate::error::{Error, Result};
use crate::evaluation::Summary;
use crate::orchestration::bus::{CommandBus, CountedBarrier};
use crate::orchestration::commands::{Command, CommandMessage};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Barriers and collected payloads shared with the command listener
#[derive(Clone)]
struct Rendezvous {
    bounds: CountedBarrier,
    generator_bulk: CountedBarrier,
    adapter_bulk: CountedBarrier,
    data_generators_done: CountedBarrier,
    task_generators_done: CountedBarrier,
    system_done: CountedBarrier,
    evaluation_done: CountedBarrier,
    reported: Arc<Mutex<Vec<Bounds>>>,
    summary: Arc<Mutex<Option<Vec<u8>>>>,
}

impl Rendezvous {
    fn new(data_generators: usize, task_generators: usize) -> Self {
        Self {
            bounds: CountedBarrier::new("collecting bounds", data_generators),
            generator_bulk: CountedBarrier::new("bulk load (generators)", data_generators),
            adapter_bulk: CountedBarrier::new("bulk load (system adapter)", 1),
            data_generators_done: CountedBarrier::new("drain (data generators)", data_generators),
            task_generators_done: CountedBarrier::new("drain (task generators)", task_generators),
            system_done: CountedBarrier::new("drain (system adapter)", 1),
            evaluation_done: CountedBarrier::new("evaluation", 1),
            reported: Arc::new(Mutex::new(Vec::new())),
            summary: Arc::new(Mutex::new(None)),
        }
    }

    fn dispatch(&self, message: CommandMessage) {
        match message.command {
            Command::ReportBounds => match decode_bounds(&message.payload) {
                Ok(bounds) => {
                    log::info!("Controller: received bounds [{}, {}]", bounds.min, bounds.max);
                    if let Ok(mut reported) = self.reported.lock() {
                        reported.push(bounds);
                    }
                    self.bounds.signal();
                }
                Err(e) => log::error!("Controller: malformed bounds report: {}", e),
            },
            Command::GenBulkDone => self.generator_bulk.signal(),
            Command::AdapterBulkDone => self.adapter_bulk.signal(),
            Command::DataGeneratorFinished => self.data_generators_done.signal(),
            Command::TaskGeneratorFinished => self.task_generators_done.signal(),
            Command::SystemFinished => self.system_done.signal(),
            Command::EvaluationFinished => {
                if let Ok(mut summary) = self.summary.lock() {
                    *summary = Some(message.payload);
                }
                self.evaluation_done.signal();
            }
            Command::BroadcastBounds
            | Command::ControllerContinue
            | Command::DataGenBulkFinished
            | Command::Start => {}
        }
    }
}

pub struct Controller {
    config: ControllerConfig,
    bus: CommandBus,
    rendezvous: Rendezvous,
    listener: JoinHandle<()>,
}

impl Controller {
    /// Starts listening immediately; create the controller before any
    /// component can publish.
    pub fn new(config: ControllerConfig, bus: CommandBus) -> Self {
        let rendezvous = Rendezvous::new(config.data_generators, config.task_generators);
        let listener = tokio::spawn(listen(bus.subscribe(), rendezvous.clone()));
        Self { config, bus, rendezvous, listener }
    }

    pub async fn run(self) -> Result<Summary> {
        let result = self.phases().await;
        self.listener.abort();
        if let Err(e) = &result {
            log::error!("Controller: run aborted: {}", e);
        }
        result
    }

    async fn phases(&self) -> Result<Summary> {
        let barrier_timeout = self.config.barrier_timeout;
        log::info!(
            "Controller: starting {} data generator(s) and {} task generator(s)",
            self.config.data_generators,
            self.config.task_generators
        );
        self.bus.signal(Command::Start)?;

        self.rendezvous.bounds.wait(barrier_timeout).await?;
        let global = self.global_bounds()?;
        log::info!("Controller: broadcasting bounds [{}, {}]", global.min, global.max);
        self.bus.publish(Command::BroadcastBounds, encode_bounds(global).to_vec())?;

        self.rendezvous.generator_bulk.wait(barrier_timeout).await?;
        log::info!("Controller: all generators finished their bulk load");
        self.bus.signal(Command::DataGenBulkFinished)?;
        self.rendezvous.adapter_bulk.wait(barrier_timeout).await?;
        log::info!("Controller: system adapter finished the bulk load, streaming");
        self.bus.signal(Command::ControllerContinue)?;

        let deadline = Instant::now() + self.config.drain_timeout;
        self.rendezvous.data_generators_done.wait_until(deadline).await?;
        log::info!("Controller: data generators finished");
        self.rendezvous.task_generators_done.wait_until(deadline).await?;
        log::info!("Controller: task generators finished");
        self.rendezvous.system_done.wait_until(deadline).await?;
        log::info!("Controller: system adapter finished, evaluating");

        self.rendezvous.evaluation_done.wait(barrier_timeout).await?;
        let payload = self
            .rendezvous
            .summary
            .lock()
            .map_err(|_| Error::DispatchFailure("summary lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| Error::DispatchFailure("evaluation finished without a summary".to_string()))?;
        let summary: Summary = serde_json::from_slice(&payload)?;
        log::info!("Controller: evaluation finished over {} task(s)", summary.task_count);
        Ok(summary)
    }

    fn global_bounds(&self) -> Result<Bounds> {
        let reported = self
            .rendezvous
            .reported
            .lock()
            .map_err(|_| Error::DispatchFailure("bounds lock poisoned".to_string()))?;
        Bounds::fold(reported.iter().copied())
            .ok_or_else(|| Error::EmptyTimeline("no generator reported bounds".to_string()))
    }
}

async fn listen(mut commands: broadcast::Receiver<CommandMessage>, rendezvous: Rendezvous) {
    loop {
        match commands.recv().await {
            Ok(message) => rendezvous.dispatch(message),
            Err(RecvError::Lagged(skipped)) => {
                log::error!("Controller: {} command(s) lost", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
