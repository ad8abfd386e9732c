pub mod bindings;
pub mod lgg;
pub mod sparql;

pub use bindings::{execute_select, Binding, SparqlJsonResults};
pub use lgg::{synthesize, GeneralizedPattern, PatternGroup, PatternSet, PatternShape, Position};
pub use sparql::{parse_insert, render_insert, render_select};
