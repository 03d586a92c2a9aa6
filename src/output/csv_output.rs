//! CSV-backed summary store
//!
//! Files start with a `section,name,count` header. Fields are quoted as in
//! RFC 4180: a field holding a comma, quote or line break is wrapped in
//! double quotes, with inner quotes doubled.

use crate::output::records::{from_records, to_records, RecordError, RecordResult, SummaryRecord};
use crate::output::traits::SummaryStore;
use crate::stats::RunSummary;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 3] = ["section", "name", "count"];

/// Summary store backed by one CSV file
#[derive(Debug, Clone)]
pub struct CsvSummaryStore {
    path: PathBuf,
}

impl CsvSummaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SummaryStore for CsvSummaryStore {
    fn save(&self, summary: &RunSummary) -> RecordResult<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        write_records(&mut writer, &to_records(summary))?;
        writer.flush()?;
        tracing::info!("Saved summary to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> RecordResult<RunSummary> {
        let file = File::open(&self.path)?;
        let summary = from_records(read_records(file)?)?;
        tracing::info!("Loaded summary from {}", self.path.display());
        Ok(summary)
    }
}

/// Writes the header and every record
pub fn write_records<W: Write>(writer: &mut W, records: &[SummaryRecord]) -> RecordResult<()> {
    write_row(writer, &HEADER)?;
    for record in records {
        write_row(
            writer,
            &[
                record.section.as_str(),
                record.name.as_str(),
                record.count.as_str(),
            ],
        )?;
    }
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, fields: &[&str]) -> RecordResult<()> {
    let line: Vec<String> = fields.iter().map(|field| quote(field)).collect();
    write!(writer, "{}\r\n", line.join(","))?;
    Ok(())
}

fn quote(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Reads records, skipping the header and rows with fewer than three fields
pub fn read_records<R: Read>(mut reader: R) -> RecordResult<Vec<SummaryRecord>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let rows = parse_rows(content.trim_start_matches('\u{feff}'))?;
    let records = rows
        .into_iter()
        .enumerate()
        .filter(|(index, row)| !(*index == 0 && is_header(row)))
        .filter_map(|(_, row)| {
            let mut fields = row.into_iter();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(section), Some(name), Some(count)) => Some(SummaryRecord {
                    section,
                    name,
                    count,
                }),
                _ => None,
            }
        })
        .collect();

    Ok(records)
}

fn is_header(row: &[String]) -> bool {
    row.len() >= HEADER.len()
        && row
            .iter()
            .zip(HEADER)
            .all(|(field, expected)| field.trim().eq_ignore_ascii_case(expected))
}

fn parse_rows(content: &str) -> RecordResult<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 0;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(RecordError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}
