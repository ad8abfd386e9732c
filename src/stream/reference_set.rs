use crate::core::Statement;
use crate::error::Result;
use crate::querying::bindings::{execute_select, SparqlJsonResults};
use oxigraph::model::{GraphName, NamedNode, Quad};
use oxigraph::store::Store;

/// Private in-memory store mirroring what the SUT should hold.
///
/// Grows with every insert a generator replays; only its owner writes to it.
pub struct ReferenceStore {
    store: Store,
    graph: NamedNode,
    size: usize,
}

impl ReferenceStore {
    pub fn new(graph: NamedNode) -> Result<Self> {
        let store = Store::new()?;
        store.insert_named_graph(&graph)?;
        Ok(Self { store, graph, size: 0 })
    }

    pub fn graph(&self) -> &NamedNode {
        &self.graph
    }

    /// Number of distinct statements loaded so far
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn insert(&mut self, statements: &[Statement]) -> Result<()> {
        let graph = GraphName::NamedNode(self.graph.clone());
        for statement in statements {
            let quad = Quad::new(
                statement.subject.clone(),
                statement.predicate.clone(),
                statement.object.clone(),
                graph.clone(),
            );
            if self.store.insert(&quad)? {
                self.size += 1;
            }
        }
        Ok(())
    }

    /// Run a verification query and return the reference answer.
    pub fn answer(&self, query: &str) -> Result<SparqlJsonResults> {
        execute_select(&self.store, query)
    }
}
