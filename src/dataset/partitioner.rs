//! Timeline partitioner
//!
//! Splits generated data into per-timestamp bucket files under `clean/` and
//! records every bucket in the `timeStamps.tsv` manifest. Each statement of
//! the input ends up in exactly one bucket:
//!
//! - a statement in the closure of several events goes to the earliest event
//! - a statement in no closure goes to the earliest bucket of its file
//! - a statement already bucketed from an earlier file is not written again

use crate::core::{Statement, TimestampBucket};
use crate::dataset::graph::StatementGraph;
use crate::dataset::registry::{DatasetKind, DatasetProfile};
use crate::error::{Error, Result};
use crate::parsing::{load_statements, parse_timestamp, write_statements};
use oxigraph::model::Term;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const BUCKET_DIR: &str = "clean";
pub const MANIFEST_FILE: &str = "timeStamps.tsv";

/// Buckets produced by one partitioning run, keyed by original timestamp.
#[derive(Debug, Default)]
pub struct Partition {
    pub buckets: BTreeMap<i64, TimestampBucket>,
    pub manifest: PathBuf,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Event timestamp as found in the data
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EventTime {
    millis: i64,
    lexical: String,
}

pub struct Partitioner {
    kind: DatasetKind,
    profile: &'static DatasetProfile,
    work_dir: PathBuf,
    unsafe_chars: Regex,
}

impl Partitioner {
    /// Buckets and manifest are written below `work_dir`.
    pub fn new(kind: DatasetKind, work_dir: impl Into<PathBuf>) -> Result<Self> {
        let unsafe_chars =
            Regex::new(r"[^A-Za-z0-9._-]").map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Self { kind, profile: kind.profile(), work_dir: work_dir.into(), unsafe_chars })
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.work_dir.join(BUCKET_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join(MANIFEST_FILE)
    }

    /// Partition every `.ttl`/`.nt` file of `source_dir`. Buckets and a
    /// manifest left in the working directory by an earlier run are replaced.
    pub fn partition(&self, source_dir: &Path) -> Result<Partition> {
        let files = source_files(source_dir)?;
        log::info!(
            "Partitioning {} {} file(s) from {}",
            files.len(),
            self.kind,
            source_dir.display()
        );
        self.clear_previous_run()?;
        fs::create_dir_all(self.bucket_dir())?;

        let mut written: HashSet<Statement> = HashSet::new();
        let mut buckets: BTreeMap<EventTime, PathBuf> = BTreeMap::new();
        let mut homeless: Vec<Statement> = Vec::new();

        for file in &files {
            let graph = StatementGraph::new(load_statements(file)?);
            let owners = self.assign(&graph)?;
            let earliest = owners.iter().flatten().min().cloned();

            let mut grouped: BTreeMap<EventTime, Vec<Statement>> = BTreeMap::new();
            for (statement, owner) in graph.statements().iter().zip(owners) {
                if written.contains(statement) {
                    continue;
                }
                match owner.or_else(|| earliest.clone()) {
                    Some(time) => grouped.entry(time).or_default().push(statement.clone()),
                    None => homeless.push(statement.clone()),
                }
            }

            for (time, statements) in grouped {
                let fresh: Vec<Statement> =
                    statements.into_iter().filter(|s| written.insert(s.clone())).collect();
                let path = self.append_to_bucket(&time, &fresh)?;
                buckets.insert(time, path);
            }
        }

        if buckets.is_empty() {
            return Err(Error::EmptyDataset(format!(
                "no {} events found in {}",
                self.profile.main_class,
                source_dir.display()
            )));
        }

        homeless.retain(|s| written.insert(s.clone()));
        if !homeless.is_empty() {
            if let Some((time, _)) = buckets.iter().next() {
                let time = time.clone();
                log::warn!(
                    "{} statement(s) from files without events added to bucket {}",
                    homeless.len(),
                    time.lexical
                );
                self.append_to_bucket(&time, &homeless)?;
            }
        }

        let manifest = self.manifest_path();
        write_manifest(&manifest, &buckets)?;
        log::info!("Partitioned into {} bucket(s), manifest {}", buckets.len(), manifest.display());

        let mut partition = Partition { buckets: BTreeMap::new(), manifest };
        for (time, path) in buckets {
            partition
                .buckets
                .entry(time.millis)
                .or_insert_with(|| TimestampBucket {
                    timestamp: time.millis,
                    lexical: time.lexical.clone(),
                    files: Vec::new(),
                })
                .files
                .push(path);
        }
        Ok(partition)
    }

    /// Owning event time of every statement of `graph`, if any.
    fn assign(&self, graph: &StatementGraph) -> Result<Vec<Option<EventTime>>> {
        let mut owners: Vec<Option<EventTime>> = vec![None; graph.len()];

        for root in graph.instances_of(self.profile.main_class) {
            let time = self.event_time(graph, &root)?;
            let mut closure = graph.outbound_closure(&root, self.profile.continuation_marker);
            if self.profile.inbound_links {
                closure.extend(graph.inbound_closure(&root));
            }
            for index in closure {
                let slot = &mut owners[index];
                if slot.as_ref().map_or(true, |current| time < *current) {
                    *slot = Some(time.clone());
                }
            }
        }

        Ok(owners)
    }

    fn event_time(&self, graph: &StatementGraph, root: &Term) -> Result<EventTime> {
        let term = graph.resolve_path(root, self.profile.timestamp_path)?;
        let Term::Literal(literal) = term else {
            return Err(Error::MalformedEvent(format!(
                "timestamp of {} is not a literal: {}",
                root, term
            )));
        };
        let lexical = literal.value().to_string();
        let millis = parse_timestamp(&lexical, self.profile.date_format)?;
        Ok(EventTime { millis, lexical })
    }

    fn clear_previous_run(&self) -> Result<()> {
        let bucket_dir = self.bucket_dir();
        if bucket_dir.exists() {
            log::debug!("Removing stale buckets in {}", bucket_dir.display());
            fs::remove_dir_all(&bucket_dir)?;
        }
        let manifest = self.manifest_path();
        if manifest.exists() {
            fs::remove_file(&manifest)?;
        }
        Ok(())
    }

    /// Merge `statements` into the bucket file of `time`, keeping what this
    /// run already wrote there.
    fn append_to_bucket(&self, time: &EventTime, statements: &[Statement]) -> Result<PathBuf> {
        let name = self.unsafe_chars.replace_all(&time.lexical, "_");
        let path = self.bucket_dir().join(format!("{}.ttl", name));

        let mut merged = if path.exists() { load_statements(&path)? } else { Vec::new() };
        let mut present: HashSet<Statement> = merged.iter().cloned().collect();
        merged.extend(statements.iter().filter(|s| present.insert((*s).clone())).cloned());

        write_statements(&path, &merged)?;
        Ok(path)
    }
}

/// Input files in name order
fn source_files(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(source_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(path.extension().and_then(|e| e.to_str()), Some("ttl") | Some("nt"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(Error::EmptyDataset(format!(
            "mimicking produced no data files in {}",
            source_dir.display()
        )));
    }
    Ok(files)
}

fn write_manifest(path: &Path, buckets: &BTreeMap<EventTime, PathBuf>) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for (time, bucket) in buckets {
        writeln!(writer, "{}\t{}", time.lexical, bucket.display())?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a manifest back into buckets keyed by epoch millis. Lexical
/// timestamps that denote the same instant share one bucket.
pub fn read_manifest(path: &Path, kind: DatasetKind) -> Result<BTreeMap<i64, TimestampBucket>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut buckets: BTreeMap<i64, TimestampBucket> = BTreeMap::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (lexical, file) = line.split_once('\t').ok_or_else(|| {
            Error::Parse(format!("{}:{}: expected <timestamp>\\t<file>", path.display(), number + 1))
        })?;
        let millis = parse_timestamp(lexical, kind.profile().date_format)?;
        let bucket = buckets.entry(millis).or_insert_with(|| TimestampBucket {
            timestamp: millis,
            lexical: lexical.to_string(),
            files: Vec::new(),
        });
        let file = PathBuf::from(file);
        if !bucket.files.contains(&file) {
            bucket.files.push(file);
        }
    }

    if buckets.is_empty() {
        return Err(Error::EmptyDataset(format!("manifest {} lists no buckets", path.display())));
    }
    log::info!("Number of unique original time stamps: {}", buckets.len());
    Ok(buckets)
}
