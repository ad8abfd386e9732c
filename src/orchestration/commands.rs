use crate::error::{Error, Result};
use std::fmt;

/// Control messages exchanged over the command bus
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Generator to controller: local `[min, max]` (16 bytes)
    ReportBounds = 200,
    /// Controller to generators: global `[min, max]` (16 bytes)
    BroadcastBounds = 201,
    /// Generator to controller: bulk inserts dispatched
    GenBulkDone = 250,
    /// Controller to generators: start streaming
    ControllerContinue = 251,
    /// Adapter to controller: bulk data applied
    AdapterBulkDone = 150,
    /// Controller to adapter: every generator finished its bulk load
    DataGenBulkFinished = 151,
    DataGeneratorFinished = 20,
    TaskGeneratorFinished = 21,
    SystemFinished = 22,
    /// Evaluator to controller: JSON summary as payload
    EvaluationFinished = 23,
    Start = 24,
}

impl Command {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    pub fn from_opcode(opcode: u8) -> Option<Self> {
        let command = match opcode {
            200 => Command::ReportBounds,
            201 => Command::BroadcastBounds,
            250 => Command::GenBulkDone,
            251 => Command::ControllerContinue,
            150 => Command::AdapterBulkDone,
            151 => Command::DataGenBulkFinished,
            20 => Command::DataGeneratorFinished,
            21 => Command::TaskGeneratorFinished,
            22 => Command::SystemFinished,
            23 => Command::EvaluationFinished,
            24 => Command::Start,
            _ => return None,
        };
        Some(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.opcode())
    }
}

/// One message on the command bus: opcode and payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMessage {
    pub command: Command,
    pub payload: Vec<u8>,
}

impl CommandMessage {
    pub fn new(command: Command, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    pub fn signal(command: Command) -> Self {
        Self { command, payload: Vec::new() }
    }

    /// `[opcode, payload...]`
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.command.opcode());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&opcode, payload) =
            bytes.split_first().ok_or_else(|| Error::Codec("empty command".to_string()))?;
        let command = Command::from_opcode(opcode)
            .ok_or_else(|| Error::Codec(format!("unknown opcode {}", opcode)))?;
        Ok(Self { command, payload: payload.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes_are_stable() {
        assert_eq!(Command::ReportBounds.opcode(), 200);
        assert_eq!(Command::ControllerContinue.opcode(), 251);
        assert_eq!(Command::DataGenBulkFinished.opcode(), 151);
        for opcode in 0..=u8::MAX {
            if let Some(command) = Command::from_opcode(opcode) {
                assert_eq!(command.opcode(), opcode);
            }
        }
    }

    #[test]
    fn test_message_layout() {
        let message = CommandMessage::new(Command::BroadcastBounds, vec![1, 2]);
        assert_eq!(message.encode(), vec![201, 1, 2]);
        assert_eq!(CommandMessage::decode(&[201, 1, 2]).unwrap(), message);
        assert!(matches!(CommandMessage::decode(&[7]), Err(Error::Codec(_))));
        assert!(matches!(CommandMessage::decode(&[]), Err(Error::Codec(_))));
    }
}
