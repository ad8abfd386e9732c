//! Indexed statement graph used to find events and their closure subgraphs.

use crate::core::Statement;
use crate::dataset::registry::RDF_TYPE;
use crate::error::{Error, Result};
use oxigraph::model::Term;
use std::collections::{HashMap, HashSet};

/// Statements of one source file with subject and object indexes.
pub struct StatementGraph {
    statements: Vec<Statement>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
}

impl StatementGraph {
    pub fn new(statements: Vec<Statement>) -> Self {
        let mut by_subject: HashMap<Term, Vec<usize>> = HashMap::new();
        let mut by_object: HashMap<Term, Vec<usize>> = HashMap::new();

        for (index, statement) in statements.iter().enumerate() {
            by_subject.entry(Term::from(statement.subject.clone())).or_default().push(index);
            by_object.entry(statement.object.clone()).or_default().push(index);
        }

        Self { statements, by_subject, by_object }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statement(&self, index: usize) -> &Statement {
        &self.statements[index]
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Subjects typed with `class_iri`, in document order.
    pub fn instances_of(&self, class_iri: &str) -> Vec<Term> {
        let mut seen = HashSet::new();
        self.statements
            .iter()
            .filter(|s| s.predicate.as_str() == RDF_TYPE)
            .filter(|s| matches!(&s.object, Term::NamedNode(class) if class.as_str() == class_iri))
            .map(|s| Term::from(s.subject.clone()))
            .filter(|root| seen.insert(root.clone()))
            .collect()
    }

    /// First object of `subject` along `predicate`
    pub fn object(&self, subject: &Term, predicate: &str) -> Option<&Term> {
        self.by_subject
            .get(subject)?
            .iter()
            .map(|&i| &self.statements[i])
            .find(|s| s.predicate.as_str() == predicate)
            .map(|s| &s.object)
    }

    /// Follow a predicate path from `root`. Every hop but the last must land
    /// on a resource.
    pub fn resolve_path(&self, root: &Term, path: &[&str]) -> Result<&Term> {
        let mut current = root;
        for (hop, predicate) in path.iter().enumerate() {
            if hop > 0 && matches!(current, Term::Literal(_)) {
                return Err(Error::MalformedEvent(format!(
                    "{} reaches literal {} before the end of its timestamp path",
                    root, current
                )));
            }
            current = self.object(current, predicate).ok_or_else(|| {
                Error::MalformedEvent(format!("{} has no <{}> link", root, predicate))
            })?;
        }
        Ok(current)
    }

    /// Indexes of every statement reachable from `root` along outbound edges.
    /// Edges whose predicate contains `stop_marker` are kept but not expanded.
    pub fn outbound_closure(&self, root: &Term, stop_marker: Option<&str>) -> Vec<usize> {
        let mut visited = HashSet::new();
        let mut claimed = HashSet::new();
        let mut closure = Vec::new();
        let mut worklist = vec![root.clone()];

        while let Some(node) = worklist.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            let Some(indexes) = self.by_subject.get(&node) else {
                continue;
            };
            for &index in indexes {
                if !claimed.insert(index) {
                    continue;
                }
                closure.push(index);
                let statement = &self.statements[index];
                let stop = stop_marker.map_or(false, |m| statement.predicate.as_str().contains(m));
                if !stop && !matches!(statement.object, Term::Literal(_)) {
                    worklist.push(statement.object.clone());
                }
            }
        }

        closure
    }

    /// Indexes of every statement from which `root` is reachable.
    pub fn inbound_closure(&self, root: &Term) -> Vec<usize> {
        let mut visited = HashSet::new();
        let mut claimed = HashSet::new();
        let mut closure = Vec::new();
        let mut worklist = vec![root.clone()];

        while let Some(node) = worklist.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            let Some(indexes) = self.by_object.get(&node) else {
                continue;
            };
            for &index in indexes {
                if claimed.insert(index) {
                    closure.push(index);
                    worklist.push(Term::from(self.statements[index].subject.clone()));
                }
            }
        }

        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_statements;
    use oxigraph::io::RdfFormat;
    use oxigraph::model::NamedNode;

    fn graph(turtle: &str) -> StatementGraph {
        StatementGraph::new(parse_statements(turtle.as_bytes(), RdfFormat::Turtle).unwrap())
    }

    fn node(iri: &str) -> Term {
        Term::from(NamedNode::new(iri).unwrap())
    }

    const DATA: &str = r#"
        @prefix ex: <http://example.org/> .
        ex:c1 a ex:Connection ; ex:time "1" ; ex:stop ex:s1 ; ex:nextConnection ex:c2 .
        ex:s1 ex:name "Stop" ; ex:geo ex:g1 .
        ex:g1 ex:lat "4.0" .
        ex:c2 a ex:Connection ; ex:time "2" .
        ex:user ex:rides ex:c1 .
        ex:agency ex:runs ex:user .
    "#;

    #[test]
    fn test_instances_in_document_order() {
        let g = graph(DATA);
        let roots = g.instances_of("http://example.org/Connection");
        assert_eq!(roots, vec![node("http://example.org/c1"), node("http://example.org/c2")]);
    }

    #[test]
    fn test_outbound_stops_at_continuation_edge() {
        let g = graph(DATA);
        let closure = g.outbound_closure(&node("http://example.org/c1"), Some("nextConnection"));
        // c1 (4 statements), s1 (2), g1 (1); c2 is not expanded
        assert_eq!(closure.len(), 7);

        let unbounded = g.outbound_closure(&node("http://example.org/c1"), None);
        assert_eq!(unbounded.len(), 9);
    }

    #[test]
    fn test_inbound_is_transitive() {
        let g = graph(DATA);
        let closure = g.inbound_closure(&node("http://example.org/c1"));
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_cycles_terminate() {
        let g = graph(
            "<http://a> <http://p> <http://b> .\n<http://b> <http://p> <http://a> .\n",
        );
        assert_eq!(g.outbound_closure(&node("http://a"), None).len(), 2);
        assert_eq!(g.inbound_closure(&node("http://a")).len(), 2);
    }

    #[test]
    fn test_resolve_path() {
        let g = graph(DATA);
        let root = node("http://example.org/c1");
        let lat = g
            .resolve_path(&root, &["http://example.org/stop", "http://example.org/geo", "http://example.org/lat"])
            .unwrap();
        assert!(matches!(lat, Term::Literal(l) if l.value() == "4.0"));

        let missing = g.resolve_path(&root, &["http://example.org/departure"]);
        assert!(matches!(missing, Err(Error::MalformedEvent(_))));

        let through_literal =
            g.resolve_path(&root, &["http://example.org/time", "http://example.org/value"]);
        assert!(matches!(through_literal, Err(Error::MalformedEvent(_))));
    }
}
