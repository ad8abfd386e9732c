//! In-process command bus and counted barriers.

use crate::error::{Error, Result};
use crate::orchestration::commands::{Command, CommandMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::{timeout_at, Instant};

const BUS_CAPACITY: usize = 1024;

/// Every participant sees every command.
#[derive(Clone)]
pub struct CommandBus {
    sender: broadcast::Sender<CommandMessage>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Receive every command published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CommandMessage> {
        self.sender.subscribe()
    }

    pub fn publish(&self, command: Command, payload: Vec<u8>) -> Result<()> {
        log::debug!("Publishing {} ({} byte payload)", command, payload.len());
        self.sender
            .send(CommandMessage::new(command, payload))
            .map(|_| ())
            .map_err(|_| Error::DispatchFailure(format!("no subscriber for {}", command)))
    }

    pub fn signal(&self, command: Command) -> Result<()> {
        self.publish(command, Vec::new())
    }
}

/// Wait on `receiver` for `command`, skipping everything else.
pub async fn wait_for(
    receiver: &mut broadcast::Receiver<CommandMessage>,
    command: Command,
    limit: Duration,
    phase: &str,
) -> Result<CommandMessage> {
    let deadline = Instant::now() + limit;
    loop {
        let received = timeout_at(deadline, receiver.recv()).await.map_err(|_| {
            Error::CoordinationTimeout { phase: phase.to_string(), expected: 1, received: 0 }
        })?;
        match received {
            Ok(message) if message.command == command => return Ok(message),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("{}: command bus lagged, {} message(s) skipped", phase, skipped);
            }
            Err(RecvError::Closed) => {
                return Err(Error::DispatchFailure(format!(
                    "{}: command bus closed while waiting for {}",
                    phase, command
                )));
            }
        }
    }
}

/// Rendezvous that opens once `expected` signals have arrived.
#[derive(Clone)]
pub struct CountedBarrier {
    phase: &'static str,
    expected: usize,
    permits: Arc<Semaphore>,
}

impl CountedBarrier {
    pub fn new(phase: &'static str, expected: usize) -> Self {
        Self { phase, expected, permits: Arc::new(Semaphore::new(0)) }
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    pub fn signal(&self) {
        self.permits.add_permits(1);
    }

    /// Signals received and not consumed yet
    pub fn received(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn wait(&self, limit: Duration) -> Result<()> {
        self.wait_until(Instant::now() + limit).await
    }

    /// Consume `expected` signals or fail with a coordination timeout.
    pub async fn wait_until(&self, deadline: Instant) -> Result<()> {
        let count = u32::try_from(self.expected)
            .map_err(|_| Error::Config(format!("{}: too many participants", self.phase)))?;
        let outcome = timeout_at(deadline, self.permits.acquire_many(count)).await;
        match outcome {
            Ok(Ok(permit)) => {
                permit.forget();
                Ok(())
            }
            Ok(Err(_)) => Err(Error::DispatchFailure(format!("{}: barrier closed", self.phase))),
            Err(_) => Err(Error::CoordinationTimeout {
                phase: self.phase.to_string(),
                expected: self.expected,
                received: self.received(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_barrier_opens_after_expected_signals() {
        let barrier = CountedBarrier::new("bounds", 2);
        barrier.signal();
        barrier.signal();
        barrier.wait(Duration::from_millis(50)).await.unwrap();
        assert_eq!(barrier.received(), 0);
    }

    #[tokio::test]
    async fn test_barrier_timeout_reports_counts() {
        let barrier = CountedBarrier::new("bulk load", 3);
        barrier.signal();
        let err = barrier.wait(Duration::from_millis(20)).await.unwrap_err();
        match err {
            Error::CoordinationTimeout { phase, expected, received } => {
                assert_eq!(phase, "bulk load");
                assert_eq!(expected, 3);
                assert_eq!(received, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_for_skips_other_commands() {
        let bus = CommandBus::new();
        let mut receiver = bus.subscribe();
        bus.signal(Command::Start).unwrap();
        bus.publish(Command::BroadcastBounds, vec![1]).unwrap();
        let message =
            wait_for(&mut receiver, Command::BroadcastBounds, Duration::from_millis(50), "bounds")
                .await
                .unwrap();
        assert_eq!(message.payload, vec![1]);
    }
}
