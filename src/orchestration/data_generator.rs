//! Data generator
//!
//! Mimics and partitions its dataset, agrees on the global timeline with the
//! controller, bulk-loads its first stream and then replays the remaining
//! streams with their scheduled delays.

use crate::config::GeneratorConfig;
use crate::core::{decode_bounds, encode_bounds, Bounds, Stream, TimestampBucket};
use crate::dataset::{read_manifest, Partitioner};
use crate::error::{Error, Result};
use crate::mimicking::SyntheticSource;
use crate::orchestration::bus::{wait_for, CommandBus};
use crate::orchestration::commands::{Command, CommandMessage};
use crate::orchestration::messages::{DataMessage, SelectTask};
use crate::orchestration::metrics::{DispatchMetrics, DispatchSnapshot};
use crate::orchestration::now_millis;
use crate::stream::builder::{output_dirs, StreamBuilder};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;

/// Subdirectory of the working directory holding mimicked data
pub const MIMICKING_DIR: &str = "mimicking";

enum Job {
    Insert(Vec<u8>),
    Select(Vec<u8>),
}

pub struct DataGenerator {
    id: usize,
    config: GeneratorConfig,
    bus: CommandBus,
    commands: broadcast::Receiver<CommandMessage>,
    data: mpsc::UnboundedSender<Vec<u8>>,
    tasks: mpsc::UnboundedSender<Vec<u8>>,
    barrier_timeout: Duration,
    metrics: Arc<DispatchMetrics>,
}

impl DataGenerator {
    /// Subscribes to the bus right away so no command is missed.
    pub fn new(
        id: usize,
        config: GeneratorConfig,
        bus: CommandBus,
        data: mpsc::UnboundedSender<Vec<u8>>,
        tasks: mpsc::UnboundedSender<Vec<u8>>,
        barrier_timeout: Duration,
    ) -> Self {
        let commands = bus.subscribe();
        Self {
            id,
            config,
            bus,
            commands,
            data,
            tasks,
            barrier_timeout,
            metrics: Arc::new(DispatchMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn run(mut self) -> Result<DispatchSnapshot> {
        let phase = format!("data generator {}", self.id);
        wait_for(&mut self.commands, Command::Start, self.barrier_timeout, &phase).await?;

        let config = self.config.clone();
        let id = self.id;
        let buckets = tokio::task::spawn_blocking(move || prepare(&config, id))
            .await
            .map_err(|e| Error::DispatchFailure(format!("{}: {}", phase, e)))??;

        let local = local_bounds(&buckets)?;
        log::info!("Data generator {}: local bounds [{}, {}]", self.id, local.min, local.max);
        self.bus.publish(Command::ReportBounds, encode_bounds(local).to_vec())?;

        let message =
            wait_for(&mut self.commands, Command::BroadcastBounds, self.barrier_timeout, &phase).await?;
        let global = decode_bounds(&message.payload)?;
        log::info!("Data generator {}: global bounds [{}, {}]", self.id, global.min, global.max);

        let builder = StreamBuilder::new(
            self.config.work_dir(self.id),
            self.config.graph_name(self.id),
            self.config.inserts_per_stream,
        );
        let duration = self.config.benchmark_duration;
        let streams = tokio::task::spawn_blocking(move || builder.build_from_buckets(&buckets, global, duration))
            .await
            .map_err(|e| Error::DispatchFailure(format!("{}: {}", phase, e)))??;

        log::info!("Start bulk loading phase for data generator {}", self.id);
        let bulk_begin = self.bulk_load(streams.first());
        self.bus.signal(Command::GenBulkDone)?;
        wait_for(&mut self.commands, Command::ControllerContinue, self.barrier_timeout, &phase).await?;
        log::info!("Bulk loading phase finished for data generator {}", self.id);

        self.replay(&streams, bulk_begin).await;

        let snapshot = self.metrics.snapshot();
        if snapshot.failures() > 0 {
            log::warn!(
                "Data generator {}: {} insert(s) and {} select(s) could not be dispatched",
                self.id,
                snapshot.inserts_failed,
                snapshot.selects_failed
            );
        }
        log::info!("Data generator {} is done: {:?}", self.id, snapshot);
        self.bus.signal(Command::DataGeneratorFinished)?;
        Ok(snapshot)
    }

    /// Graph announcement and the first stream's inserts, undelayed.
    /// Returns the wall-clock begin of the first stream.
    fn bulk_load(&self, first: Option<&Stream>) -> i64 {
        let begin = now_millis();
        let graph = self.config.graph_name(self.id).as_str().to_string();
        self.send_data(DataMessage::Graph { graph: graph.clone() }.encode(), false);
        if let Some(stream) = first {
            for insert in &stream.inserts {
                let message = DataMessage::Insert { graph: graph.clone(), update: insert.update.clone() };
                self.send_data(message.encode(), true);
            }
        }
        begin
    }

    fn send_data(&self, bytes: Vec<u8>, counted: bool) {
        match self.data.send(bytes) {
            Ok(()) if counted => {
                self.metrics.inserts_sent.fetch_add(1, Ordering::Relaxed);
            }
            Ok(()) => {}
            Err(_) => {
                log::warn!("Data generator {}: SUT data queue closed", self.id);
                if counted {
                    self.metrics.inserts_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Streams 2..N with their delays; stream 1 only owes its verification.
    /// Each stream gets its own FIFO worker.
    async fn replay(&self, streams: &[Stream], bulk_begin: i64) {
        log::info!("Data generator {} is running {} stream(s)", self.id, streams.len());
        let graph = self.config.graph_name(self.id).as_str().to_string();
        let mut queues = Vec::with_capacity(streams.len());
        let mut workers = Vec::with_capacity(streams.len());
        for stream in streams {
            let (queue, jobs) = mpsc::unbounded_channel();
            workers.push(tokio::spawn(dispatch_worker(
                self.id,
                stream.id,
                jobs,
                self.data.clone(),
                self.tasks.clone(),
                Arc::clone(&self.metrics),
            )));
            queues.push(queue);
        }

        for (stream, queue) in streams.iter().zip(&queues) {
            if stream.id == 1 {
                self.enqueue(queue, Job::Select(select_task(stream, bulk_begin).encode()));
                continue;
            }
            log::debug!("Data generator {}: dealing with stream {}", self.id, stream.id);
            let mut begin = None;
            for insert in &stream.inserts {
                sleep(Duration::from_millis(insert.delay)).await;
                begin.get_or_insert_with(now_millis);
                let message = DataMessage::Insert { graph: graph.clone(), update: insert.update.clone() };
                self.enqueue(queue, Job::Insert(message.encode()));
            }
            sleep(Duration::from_millis(stream.verification.delay)).await;
            let task = select_task(stream, begin.unwrap_or_else(now_millis));
            self.enqueue(queue, Job::Select(task.encode()));
        }

        drop(queues);
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                log::error!("Data generator {}: dispatch worker failed: {}", self.id, e);
            }
        }
    }

    fn enqueue(&self, queue: &mpsc::UnboundedSender<Job>, job: Job) {
        if let Err(mpsc::error::SendError(job)) = queue.send(job) {
            let counter = match job {
                Job::Insert(_) => &self.metrics.inserts_failed,
                Job::Select(_) => &self.metrics.selects_failed,
            };
            counter.fetch_add(1, Ordering::Relaxed);
            log::warn!("Data generator {}: stream worker is gone", self.id);
        }
    }
}

async fn dispatch_worker(
    generator: usize,
    stream_id: usize,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    data: mpsc::UnboundedSender<Vec<u8>>,
    tasks: mpsc::UnboundedSender<Vec<u8>>,
    metrics: Arc<DispatchMetrics>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Insert(bytes) => match data.send(bytes) {
                Ok(()) => {
                    metrics.inserts_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    metrics.inserts_failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{}", Error::DispatchFailure(format!(
                        "generator {} stream {}: insert dropped, SUT queue closed",
                        generator, stream_id
                    )));
                }
            },
            Job::Select(bytes) => match tasks.send(bytes) {
                Ok(()) => {
                    metrics.selects_sent.fetch_add(1, Ordering::Relaxed);
                    log::debug!("Generator {}: sent SELECT of stream {}", generator, stream_id);
                }
                Err(_) => {
                    metrics.selects_failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{}", Error::DispatchFailure(format!(
                        "generator {} stream {}: select dropped, task queue closed",
                        generator, stream_id
                    )));
                }
            },
        }
    }
}

fn select_task(stream: &Stream, begin_point: i64) -> SelectTask {
    SelectTask {
        query: stream.verification.query.clone(),
        model_size: stream.model_size() as u64,
        begin_point,
        expected: stream.verification.expected.clone(),
    }
}

fn local_bounds(buckets: &BTreeMap<i64, TimestampBucket>) -> Result<Bounds> {
    match (buckets.keys().next(), buckets.keys().next_back()) {
        (Some(&min), Some(&max)) => Ok(Bounds::new(min, max)),
        _ => Err(Error::EmptyDataset("no timestamp buckets to report".to_string())),
    }
}

/// Mimic, partition and read back the manifest of generator `id`.
pub fn prepare(config: &GeneratorConfig, id: usize) -> Result<BTreeMap<i64, TimestampBucket>> {
    let work_dir = config.work_dir(id);
    clear_previous_run(&work_dir)?;

    let source_dir = work_dir.join(MIMICKING_DIR);
    SyntheticSource::new(config.dataset, config.effective_seed(id), config.population)
        .generate(&source_dir)?;
    let partition = Partitioner::new(config.dataset, &work_dir)?.partition(&source_dir)?;
    read_manifest(&partition.manifest, config.dataset)
}

fn clear_previous_run(work_dir: &Path) -> Result<()> {
    let mut dirs = vec![work_dir.join(MIMICKING_DIR)];
    dirs.extend(output_dirs(work_dir));
    for dir in dirs {
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
    }
    Ok(())
}
