//! Review tables: transactions a person labels by hand.
//!
//! Only `Name` is required. `Date`, `Amount` and `Account` are parsed when
//! present, and every original column is written back unchanged. Output
//! always carries `Category` and `Flag`. Rows may be shorter than the header
//! but not longer, since extra fields have no column to be written under.

use csv::StringRecord;
use std::io::{Read, Write};
use std::path::Path;

use super::column_index;
use crate::error::{IngestError, Result};
use crate::types::{
    ACCOUNT_COLUMN, AMOUNT_COLUMN, CATEGORY_COLUMN, DATE_COLUMN, FLAG_COLUMN, NAME_COLUMN,
    TransactionRecord, parse_amount, parse_date, parse_flag,
};

/// A loaded review table: typed records plus the raw rows they came from.
#[derive(Debug, Clone)]
pub struct TransactionBatch {
    headers: StringRecord,
    raw: Vec<StringRecord>,
    category_idx: Option<usize>,
    flag_idx: Option<usize>,
    records: Vec<TransactionRecord>,
}

impl TransactionBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [TransactionRecord] {
        &mut self.records
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        column_index(&self.headers, column).is_some()
    }

    /// Output header: the input header plus `Category`/`Flag` when absent.
    fn output_headers(&self) -> Vec<String> {
        let mut out: Vec<String> = self.headers.iter().map(str::to_string).collect();
        if self.category_idx.is_none() {
            out.push(CATEGORY_COLUMN.to_string());
        }
        if self.flag_idx.is_none() {
            out.push(FLAG_COLUMN.to_string());
        }
        out
    }

    /// Write the table as CSV with the current category and flag of every row.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let headers = self.output_headers();
        let category_idx = self.category_idx.unwrap_or(self.headers.len());
        let flag_idx = self
            .flag_idx
            .unwrap_or(self.headers.len() + usize::from(self.category_idx.is_none()));

        wtr.write_record(&headers)?;
        for (raw, record) in self.raw.iter().zip(&self.records) {
            let mut row: Vec<String> = (0..headers.len())
                .map(|i| raw.get(i).unwrap_or("").to_string())
                .collect();
            row[category_idx] = record.category.clone();
            row[flag_idx] = if record.flag { "True" } else { "False" }.to_string();
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the table to `path`, creating parent directories as needed.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_to(file)?;
        tracing::info!(rows = self.len(), path = %path.display(), "wrote review csv");
        Ok(())
    }
}

/// Read a review table from disk.
pub fn read_review_csv(path: impl AsRef<Path>) -> Result<TransactionBatch> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IngestError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    parse_review_csv(file, &path.display().to_string())
}

/// Read a review table from any CSV source.
pub fn parse_review_csv<R: Read>(reader: R, source_name: &str) -> Result<TransactionBatch> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let name_idx = column_index(&headers, NAME_COLUMN).ok_or_else(|| IngestError::MissingColumn {
        column: NAME_COLUMN,
        source_name: source_name.to_string(),
    })?;
    let date_idx = column_index(&headers, DATE_COLUMN);
    let amount_idx = column_index(&headers, AMOUNT_COLUMN);
    let account_idx = column_index(&headers, ACCOUNT_COLUMN);
    let category_idx = column_index(&headers, CATEGORY_COLUMN);
    let flag_idx = column_index(&headers, FLAG_COLUMN);

    let field = |record: &StringRecord, idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| record.get(i))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let mut raw = Vec::new();
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() > headers.len() {
            return Err(IngestError::RaggedRow {
                source_name: source_name.to_string(),
                line: record.position().map_or(0, |p| p.line()),
                expected: headers.len(),
                found: record.len(),
            });
        }
        records.push(TransactionRecord {
            name: record.get(name_idx).unwrap_or("").trim().to_string(),
            date: field(&record, date_idx).as_deref().and_then(parse_date),
            amount: field(&record, amount_idx).as_deref().and_then(parse_amount),
            account: field(&record, account_idx),
            category: field(&record, category_idx).unwrap_or_default(),
            flag: field(&record, flag_idx).as_deref().is_some_and(parse_flag),
        });
        raw.push(record);
    }

    tracing::debug!(rows = records.len(), source = source_name, "read review csv");
    Ok(TransactionBatch {
        headers,
        raw,
        category_idx,
        flag_idx,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const INPUT: &str = "Date,Amount,Account,Name,Memo\n\
                         02/16/2026,10.00,AMEX,CLIPPER SAN FRANCISCO,bart\n\
                         02/17/2026,$37.30,AMEX,WAKABA,\n";

    fn write_string(batch: &TransactionBatch) -> String {
        let mut buf = Vec::new();
        batch.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_parses_optional_columns() {
        let batch = parse_review_csv(INPUT.as_bytes(), "inline").unwrap();
        assert_eq!(batch.len(), 2);
        let first = &batch.records()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 2, 16));
        assert_eq!(first.amount, Some(10.0));
        assert_eq!(first.account.as_deref(), Some("AMEX"));
        assert!(!first.is_labeled());
        assert!(!first.flag);
        assert_eq!(batch.records()[1].amount, Some(37.3));
        assert_eq!(batch.names(), vec!["CLIPPER SAN FRANCISCO", "WAKABA"]);
    }

    #[test]
    fn test_output_appends_category_and_flag() {
        let mut batch = parse_review_csv(INPUT.as_bytes(), "inline").unwrap();
        batch.records_mut()[0].category = "Transport".into();
        batch.records_mut()[1].flag = true;

        let out = write_string(&batch);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Date,Amount,Account,Name,Memo,Category,Flag");
        assert_eq!(lines[1], "02/16/2026,10.00,AMEX,CLIPPER SAN FRANCISCO,bart,Transport,False");
        // Raw values pass through untouched, including the dollar sign.
        assert_eq!(lines[2], "02/17/2026,$37.30,AMEX,WAKABA,,,True");
    }

    #[test]
    fn test_existing_category_and_flag_columns_are_reused() {
        let input = "Name,Category,Flag\nSHELL OIL,Gas,TRUE\nCHEVRON,,False\n";
        let mut batch = parse_review_csv(input.as_bytes(), "inline").unwrap();
        assert_eq!(batch.records()[0].category, "Gas");
        assert!(batch.records()[0].flag);

        batch.records_mut()[1].category = "Gas".into();
        let out = write_string(&batch);
        assert_eq!(out, "Name,Category,Flag\nSHELL OIL,Gas,True\nCHEVRON,Gas,False\n");
    }

    #[test]
    fn test_name_is_required() {
        let err = parse_review_csv("Description\nX\n".as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { column: "Name", .. }));
    }

    #[test]
    fn test_short_rows_pad_and_long_rows_are_rejected() {
        let batch = parse_review_csv("Name,Memo
SHELL
".as_bytes(), "inline").unwrap();
        assert_eq!(write_string(&batch), "Name,Memo,Category,Flag
SHELL,,,False
");

        let input = "Name,Memo
CHEVRON,b
SHELL,a,EXTRA1,EXTRA2
";
        let err = parse_review_csv(input.as_bytes(), "inline").unwrap_err();
        match err {
            IngestError::RaggedRow {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 4);
            }
            other => panic!("expected RaggedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_write_csv_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("labeled_transactions.csv");
        let batch = parse_review_csv(INPUT.as_bytes(), "inline").unwrap();
        batch.write_csv(&path).unwrap();

        let back = read_review_csv(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.has_column("Flag"));
    }
}
