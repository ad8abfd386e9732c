//! Partitioner Integration Tests
//!
//! These tests cover the timestamp partitioning of raw datasets:
//! - every input statement lands in exactly one bucket
//! - shared statements belong to the earliest event
//! - malformed and empty inputs are rejected
//! - the manifest reads back into the same buckets
//! - a second run into the same directory starts from scratch

use odin::core::Statement;
use odin::dataset::{read_manifest, DatasetKind, Partitioner};
use odin::mimicking::SyntheticSource;
use odin::parsing::load_statements;
use odin::Error;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TWEETS: &str = r#"
@prefix twig: <http://aksw.org/twig#> .
@prefix ex: <http://example.org/> .

ex:t1 a twig:Tweet ;
    twig:tweetTime "2016-01-01T00:00:05" ;
    twig:tweetContent ex:c1 .
ex:c1 ex:word "hello" .

ex:t2 a twig:Tweet ;
    twig:tweetTime "2016-01-01T00:00:01" ;
    twig:tweetContent ex:c1 .
ex:user ex:sent ex:t2 .

ex:orphan ex:p ex:q .
"#;

/// 2016-01-01T00:00:01Z
const FIRST: i64 = 1_451_606_401_000;
/// 2016-01-01T00:00:05Z
const SECOND: i64 = 1_451_606_405_000;

fn write_source(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

fn bucket_statements(files: &[std::path::PathBuf]) -> HashSet<Statement> {
    files.iter().flat_map(|f| load_statements(f).unwrap()).collect()
}

#[test]
fn test_every_statement_lands_in_one_bucket() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    write_source(&source, "tweets.ttl", TWEETS);

    let partition = Partitioner::new(DatasetKind::Twig, tmp.path().join("work"))
        .unwrap()
        .partition(&source)
        .unwrap();
    assert_eq!(partition.len(), 2);

    let input: HashSet<Statement> =
        load_statements(&source.join("tweets.ttl")).unwrap().into_iter().collect();
    let mut union = HashSet::new();
    let mut total = 0;
    for bucket in partition.buckets.values() {
        let statements = bucket_statements(&bucket.files);
        total += statements.len();
        union.extend(statements);
    }

    assert_eq!(union, input);
    assert_eq!(total, input.len(), "a statement was written to more than one bucket");
}

#[test]
fn test_shared_statements_belong_to_the_earliest_event() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    write_source(&source, "tweets.ttl", TWEETS);

    let partition = Partitioner::new(DatasetKind::Twig, tmp.path().join("work"))
        .unwrap()
        .partition(&source)
        .unwrap();

    let first = bucket_statements(&partition.buckets[&FIRST].files);
    let second = bucket_statements(&partition.buckets[&SECOND].files);
    let rendered: HashSet<String> = first.iter().map(ToString::to_string).collect();

    assert!(rendered.contains(r#"<http://example.org/c1> <http://example.org/word> "hello""#));
    assert!(rendered.contains("<http://example.org/user> <http://example.org/sent> <http://example.org/t2>"));
    // No event reaches it, so it joins the file's earliest event
    assert!(rendered.contains("<http://example.org/orphan> <http://example.org/p> <http://example.org/q>"));
    assert_eq!(second.len(), 3);
}

#[test]
fn test_manifest_reads_back() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    write_source(&source, "tweets.ttl", TWEETS);

    let partition = Partitioner::new(DatasetKind::Twig, tmp.path().join("work"))
        .unwrap()
        .partition(&source)
        .unwrap();
    let manifest = read_manifest(&partition.manifest, DatasetKind::Twig).unwrap();

    assert_eq!(manifest, partition.buckets);
    assert_eq!(manifest[&FIRST].lexical, "2016-01-01T00:00:01");
}

#[test]
fn test_repartitioning_replaces_previous_buckets() {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let first = tmp.path().join("first");
    write_source(&first, "tweets.ttl", TWEETS);
    Partitioner::new(DatasetKind::Twig, &work).unwrap().partition(&first).unwrap();

    let second = tmp.path().join("second");
    write_source(
        &second,
        "tweets.ttl",
        r#"
@prefix twig: <http://aksw.org/twig#> .
@prefix ex: <http://example.org/> .

ex:t3 a twig:Tweet ;
    twig:tweetTime "2016-01-01T00:00:05" ;
    twig:tweetContent ex:c9 .
ex:c9 ex:word "bye" .
"#,
    );
    let partition = Partitioner::new(DatasetKind::Twig, &work).unwrap().partition(&second).unwrap();
    let manifest = read_manifest(&partition.manifest, DatasetKind::Twig).unwrap();

    assert_eq!(manifest, partition.buckets);
    assert_eq!(manifest.keys().copied().collect::<Vec<_>>(), vec![SECOND]);
    assert_eq!(fs::read_to_string(&partition.manifest).unwrap().lines().count(), 1);
    assert_eq!(fs::read_dir(work.join("clean")).unwrap().count(), 1);

    let statements = bucket_statements(&manifest[&SECOND].files);
    assert_eq!(statements.len(), 4);
    assert!(statements.iter().all(|s| !s.to_string().contains("example.org/t1")));
}

#[test]
fn test_unparseable_timestamp_is_malformed() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    write_source(
        &source,
        "bad.ttl",
        r#"<http://example.org/t> a <http://aksw.org/twig#Tweet> ;
               <http://aksw.org/twig#tweetTime> "yesterday" ."#,
    );

    let result = Partitioner::new(DatasetKind::Twig, tmp.path().join("work"))
        .unwrap()
        .partition(&source);
    assert!(matches!(result, Err(Error::MalformedEvent(_))), "got {:?}", result.map(|p| p.len()));
}

#[test]
fn test_missing_timestamp_is_malformed() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    write_source(&source, "bad.ttl", "<http://example.org/t> a <http://aksw.org/twig#Tweet> .");

    let result = Partitioner::new(DatasetKind::Twig, tmp.path().join("work"))
        .unwrap()
        .partition(&source);
    assert!(matches!(result, Err(Error::MalformedEvent(_))));
}

#[test]
fn test_empty_inputs_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let partitioner = Partitioner::new(DatasetKind::Twig, tmp.path().join("work")).unwrap();
    assert!(matches!(partitioner.partition(&empty), Err(Error::EmptyDataset(_))));

    let eventless = tmp.path().join("eventless");
    write_source(&eventless, "data.ttl", "<http://example.org/a> <http://example.org/p> <http://example.org/b> .");
    assert!(matches!(partitioner.partition(&eventless), Err(Error::EmptyDataset(_))));
}

#[test]
fn test_mimicked_datasets_partition() {
    for kind in DatasetKind::ALL {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("mimicking");
        SyntheticSource::new(kind, 7, 120).generate(&source).unwrap();

        let partition = Partitioner::new(kind, tmp.path().join("work"))
            .unwrap()
            .partition(&source)
            .unwrap();
        assert!(!partition.is_empty(), "{} produced no buckets", kind);
    }
}
