//! SPARQL text for the SUT: `INSERT DATA` updates and verification SELECTs.

use crate::core::Statement;
use crate::error::{Error, Result};
use crate::querying::lgg::PatternSet;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedNode, Quad, Term};
use std::collections::HashMap;
use std::fmt::Write;

/// `INSERT DATA { GRAPH <graph> { ... } }` with one statement per line.
pub fn render_insert(graph: &NamedNode, statements: &[Statement]) -> String {
    let mut update = String::with_capacity(64 + statements.len() * 96);
    let _ = writeln!(update, "INSERT DATA {{");
    let _ = writeln!(update, "  GRAPH {} {{", graph);
    for statement in statements {
        let _ = writeln!(
            update,
            "    {} {} {} .",
            statement.subject, statement.predicate, statement.object
        );
    }
    update.push_str("  }\n}\n");
    update
}

/// Render a synthesized pattern set as a SELECT over `graph`.
///
/// Each group becomes one basic graph pattern; groups are joined with
/// `UNION`. Blank nodes cannot be matched by label, so fixed blank-node
/// positions are turned into extra, unprojected variables.
pub fn render_select(graph: &NamedNode, patterns: &PatternSet) -> String {
    let mut query = String::new();
    if patterns.is_empty() {
        let _ = writeln!(query, "SELECT * FROM {} WHERE {{ FILTER(false) }}", graph);
        return query;
    }

    let projection: Vec<String> = patterns.variables().iter().map(|v| format!("?{}", v)).collect();
    let _ = writeln!(query, "SELECT {}", projection.join(" "));
    let _ = writeln!(query, "FROM {}", graph);
    query.push_str("WHERE {\n");

    let mut blanks: HashMap<String, String> = HashMap::new();
    for (index, group) in patterns.groups.iter().enumerate() {
        if index > 0 {
            query.push_str("  UNION\n");
        }
        query.push_str("  {\n");
        for pattern in &group.patterns {
            let parts: Vec<String> = pattern
                .shape
                .terms
                .iter()
                .map(|slot| match slot {
                    None => format!("?{}", pattern.variable),
                    Some(Term::BlankNode(node)) => {
                        let next = blanks.len();
                        blanks
                            .entry(node.as_str().to_string())
                            .or_insert_with(|| format!("?blank{}", next))
                            .clone()
                    }
                    Some(term) => term.to_string(),
                })
                .collect();
            let _ = writeln!(query, "    {} {} {} .", parts[0], parts[1], parts[2]);
        }
        query.push_str("  }\n");
    }
    query.push_str("}\n");
    query
}

/// Quads carried by an `INSERT DATA` update.
///
/// The braces of the update enclose TriG (`GRAPH <g> { ... }`), which is
/// handed to the RDF parser as is.
pub fn parse_insert(update: &str) -> Result<Vec<Quad>> {
    let trimmed = update.trim_start();
    let keyword = trimmed.get(..11).unwrap_or_default();
    if !keyword.eq_ignore_ascii_case("INSERT DATA") {
        return Err(Error::Parse(format!(
            "expected INSERT DATA, got: {}",
            trimmed.chars().take(40).collect::<String>()
        )));
    }
    let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(Error::Parse("INSERT DATA without a body".to_string()));
    };
    if close <= open {
        return Err(Error::Parse("INSERT DATA with unbalanced braces".to_string()));
    }

    let body = &trimmed[open + 1..close];
    RdfParser::from_format(RdfFormat::TriG)
        .for_reader(body.as_bytes())
        .map(|quad| quad.map_err(|e| Error::Parse(e.to_string())))
        .collect()
}
