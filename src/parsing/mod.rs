pub mod rdf_parser;
pub mod timestamp;

pub use rdf_parser::{load_statements, parse_statements, write_statements};
pub use timestamp::parse_timestamp;
