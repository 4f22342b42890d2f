//! Training data reader.
//!
//! Expects a header row containing at least `Name` and `Category`; every
//! other column is ignored.

use std::io::Read;
use std::path::Path;

use super::column_index;
use crate::error::{IngestError, Result};
use crate::types::{CATEGORY_COLUMN, LabeledDescription, NAME_COLUMN};

/// Read labeled descriptions from a CSV file.
pub fn read_labeled_csv(path: impl AsRef<Path>) -> Result<Vec<LabeledDescription>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    parse_labeled_csv(file, &path.display().to_string())
}

/// Read labeled descriptions from any CSV source. `source_name` is only used
/// in error messages.
pub fn parse_labeled_csv<R: Read>(reader: R, source_name: &str) -> Result<Vec<LabeledDescription>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing = |column| IngestError::MissingColumn {
        column,
        source_name: source_name.to_string(),
    };
    let name_idx = column_index(&headers, NAME_COLUMN).ok_or_else(|| missing(NAME_COLUMN))?;
    let category_idx =
        column_index(&headers, CATEGORY_COLUMN).ok_or_else(|| missing(CATEGORY_COLUMN))?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // Blank trailing lines in spreadsheet exports
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        out.push(LabeledDescription {
            name: record.get(name_idx).unwrap_or("").trim().to_string(),
            category: record.get(category_idx).unwrap_or("").trim().to_string(),
        });
    }

    tracing::debug!(rows = out.len(), source = source_name, "read labeled csv");
    Ok(out)
}
