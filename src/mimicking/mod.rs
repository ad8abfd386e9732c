//! Seeded synthetic data source
//!
//! Stands in for the external mimicking algorithms: produces event-shaped
//! RDF data for every [`DatasetKind`] with a reproducible timeline. The same
//! seed and population always yield the same statements.

use crate::core::Statement;
use crate::dataset::registry::{DatasetKind, RDF_TYPE};
use crate::error::{Error, Result};
use crate::parsing::write_statements;
use chrono::{DateTime, Utc};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, Triple};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 2016-01-01T00:00:00Z
const TIMELINE_START: i64 = 1_451_606_400_000;

const LC: &str = "http://semweb.mmlab.be/ns/linkedconnections#";
const TWIG: &str = "http://aksw.org/twig#";
const TRACES: &str = "http://www.tomtom.com/ontologies/traces#";
const SSN: &str = "http://purl.oclc.org/NET/ssnx/ssn#";
const IOT: &str = "http://www.agtinternational.com/ontologies/IoTCore#";
const I40: &str = "http://www.agtinternational.com/ontologies/I4.0#";
const DATA: &str = "http://example.org/odin/";

pub struct SyntheticSource {
    kind: DatasetKind,
    seed: u64,
    population: usize,
}

impl SyntheticSource {
    /// `population` is the approximate number of statements to generate.
    pub fn new(kind: DatasetKind, seed: u64, population: usize) -> Self {
        Self { kind, seed, population }
    }

    /// Write the dataset to `<output_dir>/<KIND>_<seed>.ttl`.
    pub fn generate(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let statements = self.statements()?;
        let path = output_dir.join(format!("{}_{}.ttl", self.kind, self.seed));
        write_statements(&path, &statements)?;
        log::info!(
            "Mimicked {} statements of {} (seed {}) into {}",
            statements.len(),
            self.kind,
            self.seed,
            path.display()
        );
        Ok(path)
    }

    pub fn statements(&self) -> Result<Vec<Statement>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(self.population + 8);
        let events = (self.population / self.statements_per_event()).max(1);
        let lexical_format = self.kind.profile().date_format.replace("%.f", "%.6f");

        let mut clock = TIMELINE_START;
        for event in 0..events {
            // Several events may share one instant
            clock += rng.gen_range(0..=4) * 1000 + rng.gen_range(0..1000);
            let stamp = DateTime::<Utc>::from_timestamp_millis(clock)
                .ok_or_else(|| Error::Config(format!("timestamp {} out of range", clock)))?
                .naive_utc()
                .format(&lexical_format)
                .to_string();
            let last = event + 1 == events;
            match self.kind {
                DatasetKind::TransportData => transport(&mut out, &mut rng, event, &stamp, last),
                DatasetKind::Twig => twig(&mut out, &mut rng, event, &stamp),
                DatasetKind::Tt => trace_point(&mut out, &mut rng, event, &stamp),
                DatasetKind::Obs => observation(&mut out, &mut rng, event, &stamp),
            }
        }
        let mut seen = HashSet::new();
        out.retain(|statement| seen.insert(statement.clone()));
        Ok(out)
    }

    fn statements_per_event(&self) -> usize {
        match self.kind {
            DatasetKind::TransportData => 6,
            DatasetKind::Twig => 5,
            DatasetKind::Tt => 5,
            DatasetKind::Obs => 9,
        }
    }
}

fn iri(namespace: &str, local: impl AsRef<str>) -> NamedNode {
    NamedNode::new_unchecked(format!("{}{}", namespace, local.as_ref()))
}

fn rdf_type() -> NamedNode {
    NamedNode::new_unchecked(RDF_TYPE)
}

fn transport(out: &mut Vec<Statement>, rng: &mut StdRng, event: usize, stamp: &str, last: bool) {
    let connection = iri(DATA, format!("connection/{}", event));
    let stop_id = rng.gen_range(0..20);
    let stop = iri(DATA, format!("stop/{}", stop_id));
    let arrival = iri(DATA, format!("stop/{}", rng.gen_range(0..20)));

    out.push(Triple::new(connection.clone(), rdf_type(), iri(LC, "Connection")));
    out.push(Triple::new(connection.clone(), iri(LC, "departureTime"), Literal::new_simple_literal(stamp)));
    out.push(Triple::new(connection.clone(), iri(LC, "departureStop"), stop.clone()));
    out.push(Triple::new(connection.clone(), iri(LC, "arrivalStop"), arrival));
    out.push(Triple::new(stop, iri(LC, "stopName"), Literal::new_simple_literal(format!("stop {}", stop_id))));
    if !last {
        out.push(Triple::new(connection, iri(LC, "nextConnection"), iri(DATA, format!("connection/{}", event + 1))));
    }
}

fn twig(out: &mut Vec<Statement>, rng: &mut StdRng, event: usize, stamp: &str) {
    let tweet = iri(DATA, format!("tweet/{}", event));
    let account = iri(DATA, format!("account/{}", rng.gen_range(0..50)));
    let words: Vec<String> = (0..rng.gen_range(2..6)).map(|_| format!("w{}", rng.gen_range(0..100))).collect();

    out.push(Triple::new(tweet.clone(), rdf_type(), iri(TWIG, "Tweet")));
    out.push(Triple::new(tweet.clone(), iri(TWIG, "tweetTime"), Literal::new_typed_literal(stamp, xsd::DATE_TIME)));
    out.push(Triple::new(tweet.clone(), iri(TWIG, "tweetContent"), Literal::new_simple_literal(words.join(" "))));
    out.push(Triple::new(account.clone(), iri(TWIG, "sends"), tweet));
    out.push(Triple::new(account, rdf_type(), iri(TWIG, "OnlineTwitterAccount")));
}

fn trace_point(out: &mut Vec<Statement>, rng: &mut StdRng, event: usize, stamp: &str) {
    let point = iri(DATA, format!("point/{}", event));
    let trace = iri(DATA, format!("trace/{}", event / 10));
    let latitude = 50.0 + rng.gen_range(0.0..1.0);
    let longitude = 4.0 + rng.gen_range(0.0..1.0);

    out.push(Triple::new(point.clone(), rdf_type(), iri(TRACES, "hasPoint")));
    out.push(Triple::new(point.clone(), iri(TRACES, "hasTimestamp"), Literal::new_simple_literal(stamp)));
    out.push(Triple::new(point.clone(), iri(TRACES, "lat"), Literal::new_typed_literal(format!("{:.6}", latitude), xsd::DOUBLE)));
    out.push(Triple::new(point.clone(), iri(TRACES, "long"), Literal::new_typed_literal(format!("{:.6}", longitude), xsd::DOUBLE)));
    out.push(Triple::new(trace, iri(TRACES, "hasPoint"), point));
}

fn observation(out: &mut Vec<Statement>, rng: &mut StdRng, event: usize, stamp: &str) {
    let group = iri(DATA, format!("group/{}", event));
    let time = iri(DATA, format!("time/{}", event));

    out.push(Triple::new(group.clone(), rdf_type(), iri(I40, "MoldingMachineObservationGroup")));
    out.push(Triple::new(group.clone(), iri(SSN, "observationResultTime"), time.clone()));
    out.push(Triple::new(time, iri(IOT, "valueLiteral"), Literal::new_simple_literal(stamp)));
    for dimension in 0..2 {
        let observation = iri(DATA, format!("observation/{}/{}", event, dimension));
        let value = rng.gen_range(0..1000);
        out.push(Triple::new(group.clone(), iri(I40, "contains"), observation.clone()));
        out.push(Triple::new(observation.clone(), iri(SSN, "observedProperty"), iri(DATA, format!("property/{}", dimension))));
        out.push(Triple::new(observation, iri(IOT, "valueLiteral"), Literal::new_typed_literal(value.to_string(), xsd::INTEGER)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_data() {
        let a = SyntheticSource::new(DatasetKind::Twig, 7, 100).statements().unwrap();
        let b = SyntheticSource::new(DatasetKind::Twig, 7, 100).statements().unwrap();
        let c = SyntheticSource::new(DatasetKind::Twig, 8, 100).statements().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_population_is_approximate_statement_count() {
        for kind in DatasetKind::ALL {
            let statements = SyntheticSource::new(kind, 1, 90).statements().unwrap();
            assert!(statements.len() >= 45 && statements.len() <= 100, "{}: {}", kind, statements.len());
        }
    }
}
