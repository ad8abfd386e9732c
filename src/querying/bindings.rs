//! SPARQL 1.1 JSON results and answer bindings
//!
//! Reference answers and SUT answers travel as standard tabular JSON
//! results. For scoring, each row is reduced to a [`Binding`]: variable name
//! to the lexical form of a literal, the IRI of a named node or the label of
//! a blank node.

use crate::error::{Error, Result};
use oxigraph::model::Term;
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// One answer row, comparable as an opaque record
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Binding(BTreeMap<String, String>);

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    pub fn insert(&mut self, variable: impl Into<String>, value: impl Into<String>) {
        self.0.insert(variable.into(), value.into());
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.0.get(variable).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A bound term in the JSON results format
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl From<&Term> for JsonTerm {
    fn from(term: &Term) -> Self {
        match term {
            Term::NamedNode(node) => JsonTerm {
                kind: "uri".to_string(),
                value: node.as_str().to_string(),
                lang: None,
                datatype: None,
            },
            Term::BlankNode(node) => JsonTerm {
                kind: "bnode".to_string(),
                value: node.as_str().to_string(),
                lang: None,
                datatype: None,
            },
            Term::Literal(literal) => {
                let datatype = literal.datatype().as_str();
                JsonTerm {
                    kind: "literal".to_string(),
                    value: literal.value().to_string(),
                    lang: literal.language().map(str::to_string),
                    datatype: (datatype != XSD_STRING && datatype != RDF_LANG_STRING)
                        .then(|| datatype.to_string()),
                }
            }
            #[allow(unreachable_patterns)]
            other => JsonTerm {
                kind: "triple".to_string(),
                value: other.to_string(),
                lang: None,
                datatype: None,
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsBody {
    #[serde(default)]
    pub bindings: Vec<BTreeMap<String, JsonTerm>>,
}

/// `{"head": {"vars": [...]}, "results": {"bindings": [...]}}`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlJsonResults {
    pub head: ResultsHead,
    #[serde(default)]
    pub results: ResultsBody,
}

impl SparqlJsonResults {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.results.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.bindings.is_empty()
    }

    /// Rows reduced to comparable bindings. Unbound variables are omitted.
    pub fn bindings(&self) -> Vec<Binding> {
        self.results
            .bindings
            .iter()
            .map(|row| {
                let mut binding = Binding::new();
                for (variable, term) in row {
                    binding.insert(variable.clone(), term.value.clone());
                }
                binding
            })
            .collect()
    }
}

/// Execute a SELECT query on `store` and return its JSON results.
/// Non-SELECT queries yield an empty result set.
pub fn execute_select(store: &Store, query: &str) -> Result<SparqlJsonResults> {
    let evaluator = SparqlEvaluator::new();
    let prepared = evaluator.parse_query(query).map_err(|e| Error::Query(e.to_string()))?;
    let results = prepared.on_store(store).execute()?;

    let mut json = SparqlJsonResults::default();
    if let QueryResults::Solutions(solutions) = results {
        json.head.vars = solutions.variables().iter().map(|v| v.as_str().to_string()).collect();
        for solution in solutions {
            let solution = solution?;
            let row = solution
                .iter()
                .map(|(variable, term)| (variable.as_str().to_string(), JsonTerm::from(term)))
                .collect();
            json.results.bindings.push(row);
        }
    }

    Ok(json)
}
