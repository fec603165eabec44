//! CSV export of final counts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::counter::ClassCounts;
use crate::error::ExportError;

/// Write `Class,Count` followed by one row per class, in the order classes
/// were first accepted. There is no total row.
pub fn write_csv<W: Write>(counts: &ClassCounts, mut writer: W) -> Result<(), ExportError> {
    if counts.is_empty() {
        return Err(ExportError::Empty);
    }
    writer.write_all(b"Class,Count\r\n")?;
    for (label, count) in counts.iter() {
        write!(writer, "{},{}\r\n", escape_field(label), count)?;
    }
    writer.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the counts to it.
pub fn export_csv(counts: &ClassCounts, path: impl AsRef<Path>) -> Result<(), ExportError> {
    if counts.is_empty() {
        return Err(ExportError::Empty);
    }
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(counts, BufWriter::new(file))?;
    log::info!("Summary saved to {}", path.display());
    Ok(())
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
