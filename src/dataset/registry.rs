//! Dataset-kind registry
//!
//! Every kind of generated dataset names the class of its events, the
//! predicate path leading from an event to its generation timestamp and the
//! way its closure subgraph is computed.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Dataset kinds a data generator can mimic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    TransportData,
    Twig,
    Tt,
    Obs,
}

/// Per-kind lookup data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetProfile {
    /// Class IRI identifying event roots through `rdf:type`
    pub main_class: &'static str,
    /// Predicate hops from the event root to the timestamp literal
    pub timestamp_path: &'static [&'static str],
    /// chrono pattern of the timestamp literal
    pub date_format: &'static str,
    /// Whether statements pointing at the root belong to the event
    pub inbound_links: bool,
    /// Outbound edges whose target is not expanded (substring of the predicate IRI)
    pub continuation_marker: Option<&'static str>,
}

const TRANSPORT_DATA: DatasetProfile = DatasetProfile {
    main_class: "http://semweb.mmlab.be/ns/linkedconnections#Connection",
    timestamp_path: &["http://semweb.mmlab.be/ns/linkedconnections#departureTime"],
    date_format: "%Y-%m-%dT%H:%M:%S%.f",
    inbound_links: false,
    continuation_marker: Some("nextConnection"),
};

const TWIG: DatasetProfile = DatasetProfile {
    main_class: "http://aksw.org/twig#Tweet",
    timestamp_path: &["http://aksw.org/twig#tweetTime"],
    date_format: "%Y-%m-%dT%H:%M:%S",
    inbound_links: true,
    continuation_marker: None,
};

const TT: DatasetProfile = DatasetProfile {
    main_class: "http://www.tomtom.com/ontologies/traces#hasPoint",
    timestamp_path: &["http://www.tomtom.com/ontologies/traces#hasTimestamp"],
    date_format: "%Y-%m-%dT%H:%M:%S%.f",
    inbound_links: true,
    continuation_marker: None,
};

const OBS: DatasetProfile = DatasetProfile {
    main_class: "http://www.agtinternational.com/ontologies/I4.0#MoldingMachineObservationGroup",
    timestamp_path: &[
        "http://purl.oclc.org/NET/ssnx/ssn#observationResultTime",
        "http://www.agtinternational.com/ontologies/IoTCore#valueLiteral",
    ],
    date_format: "%Y-%m-%dT%H:%M:%S%.f",
    inbound_links: true,
    continuation_marker: None,
};

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] =
        [DatasetKind::TransportData, DatasetKind::Twig, DatasetKind::Tt, DatasetKind::Obs];

    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::TransportData => "TRANSPORT_DATA",
            DatasetKind::Twig => "TWIG",
            DatasetKind::Tt => "TT",
            DatasetKind::Obs => "OBS",
        }
    }

    pub fn profile(&self) -> &'static DatasetProfile {
        match self {
            DatasetKind::TransportData => &TRANSPORT_DATA,
            DatasetKind::Twig => &TWIG,
            DatasetKind::Tt => &TT,
            DatasetKind::Obs => &OBS,
        }
    }
}

impl FromStr for DatasetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Config(format!("Unknown dataset kind: {}", s)))
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
