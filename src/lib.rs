//! # Odin
//!
//! Odin is a streaming benchmark harness for triple stores. It replays a
//! recorded RDF dataset as a sequence of timestamped insert batches compressed
//! into a fixed benchmark window, checks the system under test (SUT) with
//! small automatically synthesized verification queries, and reports
//! recall, precision and throughput.
//!
//! ## Pipeline
//!
//! - [`dataset`] partitions a generated dataset by original event time
//! - [`stream`] rescales that timeline and groups inserts into streams
//! - [`querying`] synthesizes one verification query per stream (LGG)
//! - [`orchestration`] drives generators, the SUT adapter and the evaluator
//!   through the bulk-load, streaming and evaluation phases
//! - [`evaluation`] scores each answer and folds the run into a summary
//!
//! ## Example
//!
//! ```rust
//! use odin::evaluation::TaskEvaluation;
//! use odin::querying::bindings::Binding;
//!
//! let reference = vec![Binding::from_pairs(&[("x", "a")]), Binding::from_pairs(&[("x", "b")])];
//! let observed = vec![Binding::from_pairs(&[("x", "a")]), Binding::from_pairs(&[("x", "c")])];
//! let task = TaskEvaluation::score(&reference, &observed, 10, 0, 1_000, 1_500);
//! assert_eq!(task.recall, 0.5);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)]

/// Core data structures and byte codecs
pub mod core;

/// Dataset registry and timeline partitioning
pub mod dataset;

/// RDF file and timestamp parsing
pub mod parsing;

/// Seeded synthetic data source
pub mod mimicking;

/// Timestamp rescaling and stream construction
pub mod stream;

/// Verification query synthesis and SPARQL helpers
pub mod querying;

/// Controller, generators, relay and SUT adapter
pub mod orchestration;

/// Per-task scoring and the run summary
pub mod evaluation;

/// Environment-driven configuration
pub mod config;

pub mod error {
    //! Error types and result definitions

    use thiserror::Error;

    /// Result type alias for Odin operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Main error type for Odin
    #[derive(Error, Debug)]
    pub enum Error {
        /// An event lacks a resolvable timestamp path or a required link
        #[error("Malformed event: {0}")]
        MalformedEvent(String),

        /// Partitioning produced no buckets
        #[error("Empty dataset: {0}")]
        EmptyDataset(String),

        /// Rescaling left no usable timestamps
        #[error("Empty timeline: {0}")]
        EmptyTimeline(String),

        /// A counted rendezvous was not completed in time
        #[error("Coordination timeout in {phase}: received {received} of {expected} signals")]
        CoordinationTimeout {
            /// Phase that was waiting
            phase: String,
            /// Number of signals the barrier needed
            expected: usize,
            /// Number of signals that arrived
            received: usize,
        },

        /// Sending a message to a collaborator failed
        #[error("Dispatch failure: {0}")]
        DispatchFailure(String),

        /// A required configuration value is missing or invalid
        #[error("Configuration error: {0}")]
        Config(String),

        /// IO error
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        /// RDF or timestamp syntax error
        #[error("Parse error: {0}")]
        Parse(String),

        /// Store error
        #[error("Store error: {0}")]
        Store(String),

        /// Query error
        #[error("Query error: {0}")]
        Query(String),

        /// JSON encoding or decoding error
        #[error("Serialization error: {0}")]
        Serialization(#[from] serde_json::Error),

        /// Malformed wire message
        #[error("Codec error: {0}")]
        Codec(String),
    }

    impl From<oxigraph::store::StorageError> for Error {
        fn from(err: oxigraph::store::StorageError) -> Self {
            Error::Store(err.to_string())
        }
    }

    impl From<oxigraph::sparql::QueryEvaluationError> for Error {
        fn from(err: oxigraph::sparql::QueryEvaluationError) -> Self {
            Error::Query(err.to_string())
        }
    }
}

// Re-export commonly used types
pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("generator_seed".to_string());
        assert_eq!(format!("{}", err), "Configuration error: generator_seed");

        let err = Error::CoordinationTimeout {
            phase: "bulk load".to_string(),
            expected: 2,
            received: 1,
        };
        assert_eq!(
            err.to_string(),
            "Coordination timeout in bulk load: received 1 of 2 signals"
        );
    }
}
