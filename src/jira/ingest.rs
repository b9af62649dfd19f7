//! Jira export parsing.
//!
//! CSV and spreadsheet files are first read into a [`RawTable`], then every
//! row is validated into a [`Ticket`] or recorded as a [`RowWarning`].

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::status::StatusCategory;
use crate::error::{DashboardError, Result};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

pub const UNASSIGNED: &str = "Unassigned";
pub const NO_PRIORITY: &str = "None";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%b/%y %I:%M %p",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub category: StatusCategory,
    pub status_category: String,
    pub assignee: String,
    pub priority: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// 1-based row number in the uploaded file.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub tickets: Vec<Ticket>,
    pub warnings: Vec<RowWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Date(NaiveDateTime),
}

impl Cell {
    fn text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Date(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

/// One data row together with its row number in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Cells { number: usize, cells: Vec<Cell> },
    Unreadable { number: usize, reason: String },
}

/// Header row plus data rows, independent of the file format.
#[derive(Debug, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Reads `bytes` as a spreadsheet or as CSV, based on the file name and
    /// the leading magic bytes.
    pub fn read(filename: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DashboardError::validation("uploaded file is empty"));
        }

        if is_spreadsheet(filename, bytes) {
            debug!("Reading {filename} as a spreadsheet");
            Self::from_spreadsheet(bytes)
        } else {
            debug!("Reading {filename} as CSV");
            Self::from_csv(bytes)
        }
    }

    /// Rows that are not valid UTF-8 are kept as [`RawRow::Unreadable`].
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .byte_headers()?
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        let mut rows = Vec::new();
        for (index, record) in reader.byte_records().enumerate() {
            let record = record?;
            let number = record
                .position()
                .and_then(|pos| usize::try_from(pos.line()).ok())
                .unwrap_or(index + 2);

            rows.push(match decode_record(&record) {
                Ok(cells) => RawRow::Cells { number, cells },
                Err(reason) => RawRow::Unreadable { number, reason },
            });
        }

        Ok(Self { headers, rows })
    }

    pub fn from_spreadsheet(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DashboardError::Spreadsheet("workbook has no sheets".to_string()))??;

        // The range begins at the first non-empty cell, not at A1.
        let header_number = range
            .start()
            .map_or(1, |(row, _)| row as usize + 1);

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| row.iter().map(|cell| spreadsheet_cell(cell).text()).collect())
            .unwrap_or_default();
        let rows = rows
            .enumerate()
            .map(|(index, row)| RawRow::Cells {
                number: header_number + 1 + index,
                cells: row.iter().map(spreadsheet_cell).collect(),
            })
            .collect();

        Ok(Self { headers, rows })
    }
}

fn decode_record(record: &csv::ByteRecord) -> std::result::Result<Vec<Cell>, String> {
    record
        .iter()
        .enumerate()
        .map(|(index, field)| {
            std::str::from_utf8(field)
                .map(|text| Cell::Text(text.to_string()))
                .map_err(|_| format!("column {} is not valid UTF-8", index + 1))
        })
        .collect()
}

fn is_spreadsheet(filename: &str, bytes: &[u8]) -> bool {
    let by_extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });

    by_extension || bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC)
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(cell.to_string())),
        Data::String(text) => Cell::Text(text.clone()),
        Data::Float(value) if value.fract() == 0.0 => Cell::Text(format!("{value:.0}")),
        Data::Empty | Data::Error(_) => Cell::Text(String::new()),
        other => Cell::Text(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Key,
    Summary,
    Status,
    Assignee,
    Priority,
    Created,
    StatusCategory,
}

impl Column {
    const REQUIRED: [Column; 7] = [
        Self::Key,
        Self::Summary,
        Self::Status,
        Self::Assignee,
        Self::Priority,
        Self::Created,
        Self::StatusCategory,
    ];

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Key => &["issue key", "key"],
            Self::Summary => &["summary"],
            Self::Status => &["status"],
            Self::Assignee => &["assignee"],
            Self::Priority => &["priority"],
            Self::Created => &["created", "created date"],
            Self::StatusCategory => &["status category"],
        }
    }

    fn label(self) -> &'static str {
        self.aliases()[0]
    }
}

/// Positions of the required columns in the header row.
struct ColumnMap([usize; 7]);

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut positions = [0; 7];
        let mut missing = Vec::new();

        for (slot, column) in Column::REQUIRED.into_iter().enumerate() {
            let found = column
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            match found {
                Some(index) => positions[slot] = index,
                None => missing.push(column.label()),
            }
        }

        if !missing.is_empty() {
            return Err(DashboardError::validation(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(Self(positions))
    }

    fn cell<'a>(&self, row: &'a [Cell], column: Column) -> Option<&'a Cell> {
        row.get(self.0[column as usize]).filter(|cell| !cell.is_blank())
    }

    fn text(&self, row: &[Cell], column: Column) -> Option<String> {
        self.cell(row, column).map(Cell::text)
    }
}

/// Validates every row of `table`.
///
/// Fails only when the header row lacks a required column.
pub fn ingest(table: &RawTable) -> Result<IngestReport> {
    let columns = ColumnMap::resolve(&table.headers)?;
    let mut report = IngestReport::default();

    for row in &table.rows {
        let (row_number, outcome) = match row {
            RawRow::Cells { number, cells } => {
                if cells.iter().all(Cell::is_blank) {
                    continue;
                }
                (*number, ticket_from_row(&columns, cells))
            }
            RawRow::Unreadable { number, reason } => (*number, Err(reason.clone())),
        };

        match outcome {
            Ok(ticket) => report.tickets.push(ticket),
            Err(reason) => {
                warn!("Skipping row {row_number}: {reason}");
                report.warnings.push(RowWarning {
                    row: row_number,
                    reason,
                });
            }
        }
    }

    Ok(report)
}

fn ticket_from_row(columns: &ColumnMap, row: &[Cell]) -> std::result::Result<Ticket, String> {
    let required = |column: Column| {
        columns
            .text(row, column)
            .ok_or_else(|| format!("missing {}", column.label()))
    };

    let key = required(Column::Key)?;
    let summary = required(Column::Summary)?;
    let status = required(Column::Status)?;
    let created_cell = columns
        .cell(row, Column::Created)
        .ok_or_else(|| format!("missing {}", Column::Created.label()))?;
    let created = parse_created(created_cell)
        .ok_or_else(|| format!("unparseable created date '{}'", created_cell.text()))?;

    Ok(Ticket {
        key,
        summary,
        category: StatusCategory::normalize(&status),
        status,
        status_category: columns.text(row, Column::StatusCategory).unwrap_or_default(),
        assignee: columns
            .text(row, Column::Assignee)
            .unwrap_or_else(|| UNASSIGNED.to_string()),
        priority: columns
            .text(row, Column::Priority)
            .unwrap_or_else(|| NO_PRIORITY.to_string()),
        created,
    })
}

fn parse_created(cell: &Cell) -> Option<DateTime<Utc>> {
    match cell {
        Cell::Date(date) => Some(date.and_utc()),
        Cell::Text(text) => parse_timestamp(text.trim()),
    }
}

/// Parses the timestamp layouts found in Jira exports.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
