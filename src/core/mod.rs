//! Core data structures for the benchmark harness

use oxigraph::model::Triple;
use std::path::PathBuf;

/// A single RDF statement. Equality is structural.
pub type Statement = Triple;

/// Minimum and maximum original timestamps (milliseconds since epoch).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Widen these bounds so that they also cover `other`.
    pub fn merge(self, other: Bounds) -> Bounds {
        Bounds { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Fold any number of local bounds into the global one.
    pub fn fold<I: IntoIterator<Item = Bounds>>(bounds: I) -> Option<Bounds> {
        bounds.into_iter().reduce(Bounds::merge)
    }

    pub fn span(&self) -> i64 {
        self.max - self.min
    }
}

/// One unique original timestamp and the bucket file(s) holding its events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampBucket {
    /// Original timestamp in milliseconds since epoch
    pub timestamp: i64,
    /// Timestamp as it appeared in the data
    pub lexical: String,
    pub files: Vec<PathBuf>,
}

/// A delayed insert of one or more buckets into the SUT.
#[derive(Clone, Debug)]
pub struct InsertOperation {
    /// 1-based insert counter across all streams
    pub id: usize,
    /// Scheduled benchmark timestamp (ms from benchmark start)
    pub timestamp: i64,
    /// Wait before dispatch, in milliseconds
    pub delay: u64,
    /// `INSERT DATA` text sent to the SUT
    pub update: String,
    pub statements: Vec<Statement>,
    pub query_file: PathBuf,
    pub model_file: PathBuf,
}

impl InsertOperation {
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// The single verification query that closes a stream.
#[derive(Clone, Debug)]
pub struct VerificationQuery {
    /// Scheduled benchmark timestamp (ms from benchmark start)
    pub timestamp: i64,
    /// Wait after the stream's last insert, in milliseconds
    pub delay: u64,
    /// SELECT text sent to the SUT
    pub query: String,
    /// Reference answer as SPARQL JSON results
    pub expected: String,
    pub query_file: PathBuf,
    pub expected_file: PathBuf,
}

/// An ordered batch of insert operations followed by one verification query.
#[derive(Clone, Debug)]
pub struct Stream {
    /// 1-based stream id
    pub id: usize,
    pub inserts: Vec<InsertOperation>,
    pub verification: VerificationQuery,
    /// Timestamp of the first insert
    pub begin_point: i64,
    /// Timestamp of the verification query
    pub end_point: i64,
}

impl Stream {
    /// Number of statements inserted by this stream.
    pub fn model_size(&self) -> usize {
        self.inserts.iter().map(InsertOperation::statement_count).sum()
    }
}

pub mod encoding;
pub use encoding::*;
