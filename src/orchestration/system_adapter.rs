//! In-process system under test backed by an oxigraph store.
//!
//! Inserts arriving before every generator announced its graph are queued
//! and applied once all graphs exist. The bulk-load acknowledgement is sent
//! only after that.

use crate::error::{Error, Result};
use crate::orchestration::bus::CommandBus;
use crate::orchestration::commands::{Command, CommandMessage};
use crate::orchestration::messages::{DataMessage, SutResponse, SutTask};
use crate::orchestration::metrics::AdapterMetrics;
use crate::querying::bindings::execute_select;
use crate::querying::sparql::parse_insert;
use oxigraph::model::NamedNode;
use oxigraph::store::Store;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

pub struct SystemAdapter {
    store: Store,
    generators: usize,
    bus: CommandBus,
    commands: broadcast::Receiver<CommandMessage>,
    data: mpsc::UnboundedReceiver<Vec<u8>>,
    tasks: mpsc::UnboundedReceiver<Vec<u8>>,
    responses: mpsc::UnboundedSender<Vec<u8>>,
    metrics: Arc<AdapterMetrics>,
    graphs_seen: usize,
    queued: Vec<String>,
    bulk_requested: bool,
    bulk_acknowledged: bool,
}

impl SystemAdapter {
    pub fn new(
        generators: usize,
        bus: CommandBus,
        data: mpsc::UnboundedReceiver<Vec<u8>>,
        tasks: mpsc::UnboundedReceiver<Vec<u8>>,
        responses: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<Self> {
        let commands = bus.subscribe();
        Ok(Self {
            store: Store::new()?,
            generators,
            bus,
            commands,
            data,
            tasks,
            responses,
            metrics: Arc::new(AdapterMetrics::default()),
            graphs_seen: 0,
            queued: Vec::new(),
            bulk_requested: false,
            bulk_acknowledged: false,
        })
    }

    pub fn metrics(&self) -> Arc<AdapterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Serve data and queries until both queues are closed.
    pub async fn run(mut self) -> Result<()> {
        let mut data_open = true;
        let mut tasks_open = true;
        let mut bus_open = true;

        while data_open || tasks_open {
            tokio::select! {
                biased;
                message = self.data.recv(), if data_open => match message {
                    Some(bytes) => self.on_data(&bytes),
                    None => data_open = false,
                },
                command = self.commands.recv(), if bus_open => match command {
                    Ok(message) => {
                        if message.command == Command::DataGenBulkFinished {
                            log::info!("System adapter: bulk load finished on the generator side");
                            self.bulk_requested = true;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("System adapter: {} command(s) skipped", skipped);
                    }
                    Err(RecvError::Closed) => bus_open = false,
                },
                task = self.tasks.recv(), if tasks_open => match task {
                    Some(bytes) => self.on_task(&bytes),
                    None => tasks_open = false,
                },
            }
            self.acknowledge_bulk()?;
        }

        let received = self.metrics.received();
        let processed = self.metrics.processed();
        if received != processed {
            log::error!(
                "System adapter: {} insert(s) received but {} processed",
                received,
                processed
            );
        }
        log::info!(
            "System adapter is done: {} insert(s) applied, {} queries answered",
            processed,
            self.metrics.answered()
        );
        drop(self.responses);
        self.bus.signal(Command::SystemFinished)?;
        Ok(())
    }

    fn acknowledge_bulk(&mut self) -> Result<()> {
        if self.bulk_requested && !self.bulk_acknowledged && self.graphs_seen >= self.generators {
            self.bulk_acknowledged = true;
            self.bus.signal(Command::AdapterBulkDone)?;
        }
        Ok(())
    }

    fn on_data(&mut self, bytes: &[u8]) {
        match DataMessage::decode(bytes) {
            Ok(DataMessage::Graph { graph }) => self.create_graph(&graph),
            Ok(DataMessage::Insert { update, .. }) => {
                self.metrics.inserts_received.fetch_add(1, Ordering::Relaxed);
                if self.graphs_seen < self.generators {
                    self.queued.push(update);
                } else {
                    self.apply(&update);
                }
            }
            Err(e) => log::warn!("System adapter: unreadable data message: {}", e),
        }
    }

    fn create_graph(&mut self, graph: &str) {
        match NamedNode::new(graph) {
            Ok(node) => {
                if let Err(e) = self.store.insert_named_graph(&node) {
                    log::warn!("System adapter: cannot create graph {}: {}", graph, e);
                }
            }
            Err(e) => log::warn!("System adapter: invalid graph name {}: {}", graph, e),
        }
        self.graphs_seen += 1;
        log::info!("System adapter: graph {} ({}/{})", graph, self.graphs_seen, self.generators);

        if self.graphs_seen == self.generators {
            for update in std::mem::take(&mut self.queued) {
                self.apply(&update);
            }
        }
    }

    fn apply(&self, update: &str) {
        let result = parse_insert(update).and_then(|quads| {
            for quad in &quads {
                self.store.insert(quad)?;
            }
            Ok(())
        });
        match result {
            Ok(()) => {
                self.metrics.inserts_processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => log::warn!("System adapter: insert failed: {}", e),
        }
    }

    fn on_task(&self, bytes: &[u8]) {
        let task = match SutTask::decode(bytes) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("System adapter: unreadable task: {}", e);
                return;
            }
        };

        let body = match execute_select(&self.store, &task.query).and_then(|r| r.to_vec()) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("System adapter: task {} failed: {}", task.task_id, e);
                Vec::new()
            }
        };
        self.metrics.queries_answered.fetch_add(1, Ordering::Relaxed);

        let response = SutResponse { task_id: task.task_id, body };
        if self.responses.send(response.encode()).is_err() {
            log::warn!(
                "{}",
                Error::DispatchFailure(format!("task {}: response queue closed", task.task_id))
            );
        }
    }
}
