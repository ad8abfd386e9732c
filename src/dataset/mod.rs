//! Dataset registry and timeline partitioning
//!
//! A generated dataset is a set of RDF files. Each dataset kind names the
//! class of its events and the predicate path to their generation timestamp
//! (see [`registry`]). The [`partitioner`] groups the closure subgraph of
//! every event into one file per original timestamp.

pub mod graph;
pub mod partitioner;
pub mod registry;

pub use graph::StatementGraph;
pub use partitioner::{read_manifest, Partition, Partitioner, BUCKET_DIR, MANIFEST_FILE};
pub use registry::{DatasetKind, DatasetProfile};
