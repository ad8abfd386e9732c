//! Data and task messages, encoded as length-prefixed byte arrays.

use crate::core::encoding::{read_byte_arrays, write_byte_arrays, ByteReader};
use crate::error::{Error, Result};
use crate::evaluation::ExpectedAnswer;

/// Generator to SUT
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataMessage {
    /// Bulk phase: announce the generator's target graph
    Graph { graph: String },
    Insert { graph: String, update: String },
}

impl DataMessage {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DataMessage::Graph { graph } => write_byte_arrays(&[graph.as_bytes()]),
            DataMessage::Insert { graph, update } => {
                write_byte_arrays(&[graph.as_bytes(), update.as_bytes()])
            }
        }
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut parts = read_byte_arrays(buffer)?.into_iter().map(utf8);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(graph), None, None) => Ok(DataMessage::Graph { graph: graph? }),
            (Some(graph), Some(update), None) => {
                Ok(DataMessage::Insert { graph: graph?, update: update? })
            }
            _ => Err(Error::Codec("data message must carry 1 or 2 fields".to_string())),
        }
    }
}

fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::Codec(e.to_string()))
}

/// Generator to task generator: one stream's verification query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectTask {
    pub query: String,
    pub model_size: u64,
    /// Wall-clock millis of the stream's first insert
    pub begin_point: i64,
    /// Reference answer, SPARQL JSON
    pub expected: String,
}

impl SelectTask {
    pub fn encode(&self) -> Vec<u8> {
        let model_size = self.model_size.to_string();
        let begin_point = self.begin_point.to_string();
        write_byte_arrays(&[
            self.query.as_bytes(),
            model_size.as_bytes(),
            begin_point.as_bytes(),
            self.expected.as_bytes(),
        ])
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buffer);
        Ok(Self {
            query: reader.read_string()?,
            model_size: reader.read_i64()?.max(0) as u64,
            begin_point: reader.read_i64()?,
            expected: reader.read_string()?,
        })
    }
}

/// Task generator to SUT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SutTask {
    pub task_id: u64,
    pub query: String,
}

impl SutTask {
    pub fn encode(&self) -> Vec<u8> {
        let task_id = self.task_id.to_string();
        write_byte_arrays(&[task_id.as_bytes(), self.query.as_bytes()])
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buffer);
        Ok(Self { task_id: read_task_id(&mut reader)?, query: reader.read_string()? })
    }
}

/// SUT to evaluation storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SutResponse {
    pub task_id: u64,
    /// SPARQL JSON, empty when the query failed
    pub body: Vec<u8>,
}

impl SutResponse {
    pub fn encode(&self) -> Vec<u8> {
        let task_id = self.task_id.to_string();
        write_byte_arrays(&[task_id.as_bytes(), &self.body])
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buffer);
        Ok(Self { task_id: read_task_id(&mut reader)?, body: reader.read_bytes()?.to_vec() })
    }
}

/// Task generator to evaluation storage
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationTask {
    pub task_id: u64,
    pub expected: ExpectedAnswer,
}

impl EvaluationTask {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let task_id = self.task_id.to_string();
        let expected = self.expected.encode()?;
        Ok(write_byte_arrays(&[task_id.as_bytes(), &expected]))
    }

    pub fn decode(buffer: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buffer);
        let task_id = read_task_id(&mut reader)?;
        let expected = ExpectedAnswer::decode(reader.read_bytes()?)?;
        Ok(Self { task_id, expected })
    }
}

fn read_task_id(reader: &mut ByteReader<'_>) -> Result<u64> {
    let id = reader.read_i64()?;
    u64::try_from(id).map_err(|_| Error::Codec(format!("negative task id {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::querying::bindings::SparqlJsonResults;

    #[test]
    fn test_data_message_kinds() {
        let graph = DataMessage::Graph { graph: "http://www.graph1.com/".to_string() };
        assert_eq!(DataMessage::decode(&graph.encode()).unwrap(), graph);

        let insert = DataMessage::Insert {
            graph: "http://www.graph1.com/".to_string(),
            update: "INSERT DATA { }".to_string(),
        };
        assert_eq!(DataMessage::decode(&insert.encode()).unwrap(), insert);
        let three = write_byte_arrays(&[b"a".as_slice(), b"b".as_slice(), b"c".as_slice()]);
        assert!(DataMessage::decode(&three).is_err());
    }

    #[test]
    fn test_select_task_numbers_are_decimal_strings() {
        let task = SelectTask {
            query: "SELECT * WHERE {}".to_string(),
            model_size: 12,
            begin_point: 1_700_000_000_000,
            expected: "{}".to_string(),
        };
        let bytes = task.encode();
        let arrays = read_byte_arrays(&bytes).unwrap();
        assert_eq!(arrays[1], b"12".to_vec());
        assert_eq!(SelectTask::decode(&bytes).unwrap(), task);
    }

    #[test]
    fn test_evaluation_task_nests_expected_answer() {
        let task = EvaluationTask {
            task_id: 3,
            expected: ExpectedAnswer {
                model_size: 1,
                begin_point: 10,
                sent_at: 20,
                results: SparqlJsonResults::default(),
            },
        };
        assert_eq!(EvaluationTask::decode(&task.encode().unwrap()).unwrap(), task);
        assert!(SutTask::decode(&write_byte_arrays(&[b"-1".as_slice(), b"q".as_slice()])).is_err());
    }
}
