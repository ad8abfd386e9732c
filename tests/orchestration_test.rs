//! Orchestration Integration Tests
//!
//! These tests drive the controller over the command bus:
//! - bounds reported by the generators are folded and broadcast
//! - a rendezvous that never completes fails with a coordination timeout
//! - a whole run against the in-process system adapter

use odin::config::{ControllerConfig, GeneratorConfig};
use odin::core::{decode_bounds, encode_bounds, Bounds};
use odin::dataset::DatasetKind;
use odin::orchestration::bus::wait_for;
use odin::orchestration::{run_benchmark, Command, CommandBus, Controller};
use odin::stream::SELECT_DIR;
use odin::Error;
use std::time::Duration;
use tempfile::TempDir;

fn controller_config(output: &std::path::Path, barrier_timeout: Duration) -> ControllerConfig {
    ControllerConfig {
        data_generators: 2,
        task_generators: 1,
        generator: GeneratorConfig {
            seed: 11,
            population: 60,
            dataset: DatasetKind::Twig,
            output_dir: output.to_path_buf(),
            inserts_per_stream: 3,
            benchmark_duration: 400,
        },
        barrier_timeout,
        drain_timeout: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_bounds_are_folded_and_broadcast() {
    let tmp = TempDir::new().unwrap();
    let bus = CommandBus::new();
    let mut generator = bus.subscribe();
    let controller =
        Controller::new(controller_config(tmp.path(), Duration::from_millis(500)), bus.clone());
    let run = tokio::spawn(controller.run());

    wait_for(&mut generator, Command::Start, Duration::from_secs(5), "test").await.unwrap();
    bus.publish(Command::ReportBounds, encode_bounds(Bounds::new(100, 900)).to_vec()).unwrap();
    bus.publish(Command::ReportBounds, encode_bounds(Bounds::new(50, 1000)).to_vec()).unwrap();

    let broadcast =
        wait_for(&mut generator, Command::BroadcastBounds, Duration::from_secs(5), "test").await.unwrap();
    assert_eq!(decode_bounds(&broadcast.payload).unwrap(), Bounds::new(50, 1000));

    // Nobody finishes the bulk load
    match run.await.unwrap() {
        Err(Error::CoordinationTimeout { expected, received, .. }) => {
            assert_eq!((expected, received), (2, 0));
        }
        other => panic!("expected a coordination timeout, got {:?}", other.map(|s| s.task_count)),
    }
}

#[tokio::test]
async fn test_missing_bounds_report_times_out() {
    let tmp = TempDir::new().unwrap();
    let bus = CommandBus::new();
    let mut generator = bus.subscribe();
    let controller =
        Controller::new(controller_config(tmp.path(), Duration::from_millis(300)), bus.clone());
    let run = tokio::spawn(controller.run());

    wait_for(&mut generator, Command::Start, Duration::from_secs(5), "test").await.unwrap();
    bus.publish(Command::ReportBounds, encode_bounds(Bounds::new(0, 10)).to_vec()).unwrap();

    match run.await.unwrap() {
        Err(Error::CoordinationTimeout { phase, expected, received }) => {
            assert_eq!(phase, "collecting bounds");
            assert_eq!((expected, received), (2, 1));
        }
        other => panic!("expected a coordination timeout, got {:?}", other.map(|s| s.task_count)),
    }
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut config = controller_config(tmp.path(), Duration::from_secs(1));
    config.task_generators = 0;
    assert!(matches!(run_benchmark(config).await, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_full_run_against_in_process_store() {
    let tmp = TempDir::new().unwrap();
    let config = controller_config(tmp.path(), Duration::from_secs(30));
    let generator = config.generator.clone();

    let summary = run_benchmark(config).await.unwrap();

    assert!(summary.task_count >= 2, "one task per stream of each generator");
    assert_eq!(summary.tasks.len(), summary.task_count);
    // Every statement a verification query expects was inserted before it
    assert_eq!(summary.micro_recall, 1.0);
    assert_eq!(summary.macro_recall, 1.0);
    assert!(summary.micro_precision > 0.0);
    assert!(summary.tasks.iter().all(|t| t.model_size > 0));
    assert!(summary.tasks.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));

    for id in 1..=2 {
        let selects = generator.work_dir(id).join(SELECT_DIR);
        assert!(selects.join("selectQuery1.sparql").is_file(), "{}", selects.display());
    }
}
