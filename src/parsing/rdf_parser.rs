use crate::core::Statement;
use crate::error::{Error, Result};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::Triple;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Pick the RDF syntax from a file extension (`ttl`, `nt`, `trig`, ...)
pub fn format_for_path(path: &Path) -> Result<RdfFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    RdfFormat::from_extension(extension)
        .ok_or_else(|| Error::Parse(format!("Unsupported RDF file: {}", path.display())))
}

/// Parse RDF text into statements, dropping graph names and duplicates.
/// Statement order follows the document.
pub fn parse_statements<R: Read>(reader: R, format: RdfFormat) -> Result<Vec<Statement>> {
    let mut seen = HashSet::new();
    let mut statements = Vec::new();

    for quad in RdfParser::from_format(format).for_reader(reader) {
        let quad = quad.map_err(|e| Error::Parse(e.to_string()))?;
        let triple = Triple::new(quad.subject, quad.predicate, quad.object);
        if seen.insert(triple.clone()) {
            statements.push(triple);
        }
    }

    Ok(statements)
}

/// Load every statement of an RDF file
pub fn load_statements(path: &Path) -> Result<Vec<Statement>> {
    let format = format_for_path(path)?;
    let file = File::open(path)?;
    parse_statements(BufReader::new(file), format)
        .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))
}

/// Write statements to `path` as Turtle, replacing any previous content
pub fn write_statements(path: &Path, statements: &[Statement]) -> Result<()> {
    let file = File::create(path)?;
    let mut serializer =
        RdfSerializer::from_format(RdfFormat::Turtle).for_writer(BufWriter::new(file));
    for statement in statements {
        serializer.serialize_triple(statement)?;
    }
    serializer.finish()?.flush()?;
    Ok(())
}
