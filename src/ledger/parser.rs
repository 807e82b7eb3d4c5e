use super::normalizer::normalize_text;
use super::{ActivityRecord, LedgerError, UnitOfMeasure};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "FECHA",
    "ZONA",
    "DESCRIPCION",
    "UNIDAD_MEDIDA",
    "CANTIDAD",
    "VALOR_UNITARIO",
    "VALOR_TOTAL",
    "TIPO_ACT",
];

const ITEM_COLUMN: &str = "ACTIVIDAD";
const ID_COLUMN: &str = "ID_ACTIVIDAD";

/// Cell value independent of the source format.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

#[derive(Debug, Default)]
pub(super) struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

pub(super) fn read_csv<R: Read>(reader: R) -> Result<RawTable, LedgerError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|value| {
                    if value.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(value.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(RawTable { headers, rows })
}

pub(super) fn read_workbook(path: &Path, sheet: &str) -> Result<RawTable, LedgerError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| LedgerError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(LedgerError::SheetNotFound {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| LedgerError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header.iter().map(cell_header).collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_header(data: &Data) -> String {
    match cell_from_data(data) {
        Cell::Text(text) => text,
        Cell::Number(number) => number.to_string(),
        Cell::Date(date) => date.to_string(),
        Cell::Empty => String::new(),
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) if text.trim().is_empty() => Cell::Empty,
        Data::String(text) => Cell::Text(text.trim().to_string()),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::DateTime(value) => excel_serial_date(value.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Column lookup keyed by trimmed, upper-cased header text.
struct ColumnIndex(HashMap<String, usize>);

impl ColumnIndex {
    fn new(headers: &[String]) -> Result<Self, LedgerError> {
        let mut map = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            map.entry(header.trim().to_uppercase()).or_insert(index);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !map.contains_key(**column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::MissingColumns(missing));
        }

        Ok(Self(map))
    }

    fn cell<'a>(&self, row: &'a [Cell], column: &str) -> &'a Cell {
        self.0
            .get(column)
            .and_then(|index| row.get(*index))
            .unwrap_or(&Cell::Empty)
    }
}

pub(super) fn records_from_table(table: RawTable) -> Result<Vec<ActivityRecord>, LedgerError> {
    let columns = ColumnIndex::new(&table.headers)?;
    let mut records = Vec::with_capacity(table.rows.len());

    for (offset, row) in table.rows.iter().enumerate() {
        // Header is line 1.
        let line = offset + 2;
        if row.iter().all(|cell| *cell == Cell::Empty) {
            continue;
        }

        let Some(date) = cell_date(columns.cell(row, "FECHA")) else {
            tracing::warn!(line, "skipping ledger row with unreadable FECHA");
            continue;
        };

        records.push(ActivityRecord {
            date,
            zone: normalize_text(&cell_text(columns.cell(row, "ZONA")).unwrap_or_default()),
            item: cell_text(columns.cell(row, ITEM_COLUMN)).map(|item| normalize_text(&item)),
            description: normalize_text(
                &cell_text(columns.cell(row, "DESCRIPCION")).unwrap_or_default(),
            ),
            unit: UnitOfMeasure::parse(
                &cell_text(columns.cell(row, "UNIDAD_MEDIDA")).unwrap_or_default(),
            ),
            quantity: cell_amount(columns.cell(row, "CANTIDAD"), line, "CANTIDAD"),
            unit_price: cell_amount(columns.cell(row, "VALOR_UNITARIO"), line, "VALOR_UNITARIO"),
            total_value: cell_amount(columns.cell(row, "VALOR_TOTAL"), line, "VALOR_TOTAL"),
            activity_type: normalize_text(
                &cell_text(columns.cell(row, "TIPO_ACT")).unwrap_or_default(),
            ),
            activity_id: cell_identifier(columns.cell(row, ID_COLUMN)),
        });
    }

    Ok(records)
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Cell::Number(number) if number.fract() == 0.0 => Some(format!("{number:.0}")),
        Cell::Number(number) => Some(number.to_string()),
        Cell::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
    }
}

/// Photo-directory key: integral floats lose their `.0`, `nan` counts as empty.
fn cell_identifier(cell: &Cell) -> Option<String> {
    cell_text(cell).filter(|id| !id.eq_ignore_ascii_case("nan"))
}

fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(date) => Some(*date),
        Cell::Number(serial) => excel_serial_date(*serial),
        Cell::Text(text) => parse_date(text),
        Cell::Empty => None,
    }
}

fn cell_amount(cell: &Cell, line: usize, column: &str) -> f64 {
    match cell {
        Cell::Number(number) => *number,
        Cell::Empty => 0.0,
        Cell::Text(text) => parse_amount(text).unwrap_or_else(|| {
            tracing::warn!(line, column, value = %text, "unreadable amount, using 0");
            0.0
        }),
        Cell::Date(_) => {
            tracing::warn!(line, column, "date found in numeric column, using 0");
            0.0
        }
    }
}

/// Strips `$`, `,` and spaces before parsing (`"$ 1,250,000"` -> `1250000`).
pub(crate) fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }

    None
}

const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// Day serials count from 1899-12-30 (the 1900 leap-year bug included).
pub(crate) fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}
