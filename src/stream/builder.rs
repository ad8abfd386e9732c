//! Stream Builder
//!
//! Turns the rescaled timeline into streams. Every benchmark timestamp
//! becomes one insert operation; `inserts_per_stream` consecutive inserts
//! form a stream, a trailing partial slot forms the last stream. Delays of
//! stream `s` are divided by `2^(s-1)`. The last stream, even when it is the
//! only one, runs without delays so the run ends deterministically.
//!
//! Closing a stream synthesizes its verification query over the statements
//! the stream inserted and answers it against the reference store, which at
//! that point holds every insert replayed so far.

use crate::core::{Bounds, InsertOperation, Statement, Stream, TimestampBucket, VerificationQuery};
use crate::error::{Error, Result};
use crate::parsing::{load_statements, write_statements};
use crate::querying::{render_insert, render_select, synthesize};
use crate::stream::reference_set::ReferenceStore;
use crate::stream::rescale::rescale_buckets;
use oxigraph::model::NamedNode;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const INSERT_DIR: &str = "insertQueries";
pub const SELECT_DIR: &str = "selectQueries";
pub const EXPECTED_DIR: &str = "expectedResults";

/// Delay of the first verification query, in milliseconds
pub const INITIAL_SELECT_DELAY: u64 = 1000;

pub struct StreamBuilder {
    work_dir: PathBuf,
    graph: NamedNode,
    inserts_per_stream: usize,
    initial_select_delay: u64,
}

impl StreamBuilder {
    pub fn new(work_dir: impl Into<PathBuf>, graph: NamedNode, inserts_per_stream: usize) -> Self {
        Self {
            work_dir: work_dir.into(),
            graph,
            inserts_per_stream,
            initial_select_delay: INITIAL_SELECT_DELAY,
        }
    }

    pub fn with_select_delay(mut self, delay: u64) -> Self {
        self.initial_select_delay = delay;
        self
    }

    pub fn graph(&self) -> &NamedNode {
        &self.graph
    }

    /// Rescale `buckets` from the global `bounds` onto `[0, duration]` and
    /// build the streams.
    pub fn build_from_buckets(
        &self,
        buckets: &BTreeMap<i64, TimestampBucket>,
        bounds: Bounds,
        duration: i64,
    ) -> Result<Vec<Stream>> {
        let timeline = rescale_buckets(buckets, bounds, duration)?;
        self.build(&timeline)
    }

    /// Build streams from a rescaled timeline (benchmark timestamp to the
    /// bucket files scheduled at that instant).
    pub fn build(&self, timeline: &BTreeMap<i64, Vec<PathBuf>>) -> Result<Vec<Stream>> {
        let per_stream = self.inserts_per_stream;
        if per_stream == 0 {
            return Err(Error::Config("inserts per stream must be at least 1".to_string()));
        }
        if timeline.is_empty() {
            return Err(Error::EmptyTimeline("no insert operations to schedule".to_string()));
        }

        let total = timeline.len();
        let stream_count = total.div_ceil(per_stream);
        for dir in [INSERT_DIR, SELECT_DIR, EXPECTED_DIR] {
            fs::create_dir_all(self.work_dir.join(dir))?;
        }

        let mut reference = ReferenceStore::new(self.graph.clone())?;
        let mut streams = Vec::with_capacity(stream_count);
        let mut pending: Vec<InsertOperation> = Vec::with_capacity(per_stream);
        let mut previous_rescaled = 0i64;
        let mut scheduled = 0i64;

        for (index, (rescaled, files)) in timeline.iter().enumerate() {
            let counter = index + 1;
            let stream_id = index / per_stream + 1;
            let muted = stream_id == stream_count;

            let delay = if muted {
                0
            } else {
                halve(rescaled.saturating_sub(previous_rescaled), stream_id)
            };
            scheduled += delay as i64;
            previous_rescaled = *rescaled;

            let statements = merge_files(files)?;
            reference.insert(&statements)?;
            pending.push(self.insert_operation(counter, scheduled, delay, statements)?);

            if counter % per_stream == 0 || counter == total {
                let select_delay = if muted { 0 } else { halve(self.initial_select_delay as i64, stream_id) };
                let stream = self.close_stream(stream_id, std::mem::take(&mut pending), select_delay, &reference)?;
                log::debug!(
                    "Stream {}: {} insert(s), {} statement(s), [{}, {}]",
                    stream.id,
                    stream.inserts.len(),
                    stream.model_size(),
                    stream.begin_point,
                    stream.end_point
                );
                streams.push(stream);
            }
        }

        log::info!(
            "Built {} stream(s) from {} insert operation(s) into {}",
            streams.len(),
            total,
            self.work_dir.display()
        );
        Ok(streams)
    }

    fn insert_operation(
        &self,
        id: usize,
        timestamp: i64,
        delay: u64,
        statements: Vec<Statement>,
    ) -> Result<InsertOperation> {
        let dir = self.work_dir.join(INSERT_DIR);
        let query_file = dir.join(format!("insertQuery{}.sparql", id));
        let model_file = dir.join(format!("model{}.ttl", id));

        let update = render_insert(&self.graph, &statements);
        fs::write(&query_file, &update)?;
        write_statements(&model_file, &statements)?;

        Ok(InsertOperation { id, timestamp, delay, update, statements, query_file, model_file })
    }

    fn close_stream(
        &self,
        id: usize,
        inserts: Vec<InsertOperation>,
        delay: u64,
        reference: &ReferenceStore,
    ) -> Result<Stream> {
        let mut seen = HashSet::new();
        let statements: Vec<Statement> = inserts
            .iter()
            .flat_map(|insert| insert.statements.iter())
            .filter(|s| seen.insert(*s))
            .cloned()
            .collect();

        let patterns = synthesize(&statements);
        let query = render_select(&self.graph, &patterns);
        let expected = String::from_utf8(reference.answer(&query)?.to_vec()?)
            .map_err(|e| Error::Codec(e.to_string()))?;

        let query_file = self.work_dir.join(SELECT_DIR).join(format!("selectQuery{}.sparql", id));
        let expected_file =
            self.work_dir.join(EXPECTED_DIR).join(format!("expectedResults{}.sparql", id));
        fs::write(&query_file, &query)?;
        fs::write(&expected_file, &expected)?;

        let begin_point = inserts.first().map_or(0, |i| i.timestamp);
        let last = inserts.last().map_or(0, |i| i.timestamp);
        let timestamp = last + delay as i64;

        Ok(Stream {
            id,
            inserts,
            verification: VerificationQuery { timestamp, delay, query, expected, query_file, expected_file },
            begin_point,
            end_point: timestamp,
        })
    }
}

/// `floor(gap / 2^(stream_id - 1))`; negative gaps count as zero.
fn halve(gap: i64, stream_id: usize) -> u64 {
    let gap = u64::try_from(gap).unwrap_or(0);
    let shift = u32::try_from(stream_id.saturating_sub(1)).unwrap_or(u32::MAX);
    gap.checked_shr(shift).unwrap_or(0)
}

/// Statements of every file, in file order, without duplicates.
fn merge_files(files: &[PathBuf]) -> Result<Vec<Statement>> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for file in files {
        merged.extend(load_statements(file)?.into_iter().filter(|s| seen.insert(s.clone())));
    }
    Ok(merged)
}

/// Working-directory subfolders written by a build, for cleanup.
pub fn output_dirs(work_dir: &Path) -> [PathBuf; 3] {
    [work_dir.join(INSERT_DIR), work_dir.join(SELECT_DIR), work_dir.join(EXPECTED_DIR)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halve() {
        assert_eq!(halve(1000, 1), 1000);
        assert_eq!(halve(1000, 2), 500);
        assert_eq!(halve(1001, 3), 250);
        assert_eq!(halve(-5, 1), 0);
        assert_eq!(halve(i64::MAX, 200), 0);
    }
}
