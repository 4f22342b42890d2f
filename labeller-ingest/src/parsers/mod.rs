pub mod labeled_csv;
pub mod review_csv;

use csv::StringRecord;

/// Position of `column` in a header row. Surrounding whitespace and a
/// leading byte-order mark are ignored.
pub(crate) fn column_index(headers: &StringRecord, column: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == column)
}
