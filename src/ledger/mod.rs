pub mod normalizer;
mod parser;

use crate::window::ReportingWindow;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

pub use parser::REQUIRED_COLUMNS;
pub(crate) use parser::{excel_serial_date, parse_date};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open ledger workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("sheet '{sheet}' not found in ledger {path}")]
    SheetNotFound { path: PathBuf, sheet: String },
    #[error("invalid ledger CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("ledger is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("unsupported ledger format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Closed set of measurement units used by the contract; anything else is
/// carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum UnitOfMeasure {
    Linear,
    Area,
    Volume,
    Count,
    Other(String),
}

impl UnitOfMeasure {
    /// Rollup order of the spreadsheet summary.
    pub fn ordered() -> [Self; 4] {
        [Self::Linear, Self::Area, Self::Volume, Self::Count]
    }

    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "ML" => Self::Linear,
            "M2" => Self::Area,
            "M3" => Self::Volume,
            "UND" => Self::Count,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Linear => "ML",
            Self::Area => "M2",
            Self::Volume => "M3",
            Self::Count => "UND",
            Self::Other(code) => code,
        }
    }
}

/// One ledger row. `total_value` is trusted as stored and is never
/// reconciled against `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub date: NaiveDate,
    pub zone: String,
    pub item: Option<String>,
    pub description: String,
    pub unit: UnitOfMeasure,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_value: f64,
    pub activity_type: String,
    pub activity_id: Option<String>,
}

/// Read-only ledger, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ActivityDataset {
    records: Vec<ActivityRecord>,
}

impl ActivityDataset {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self { records }
    }

    /// Loads a workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`) from `sheet`, or a
    /// `.csv` export, cleaning each description through the normalizer.
    pub fn from_path<P: AsRef<Path>>(path: P, sheet: &str) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let table = match extension.as_deref() {
            Some("csv") => {
                let file = std::fs::File::open(path).map_err(|source| LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                parser::read_csv(file)?
            }
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => parser::read_workbook(path, sheet)?,
            _ => return Err(LedgerError::UnsupportedFormat(path.to_path_buf())),
        };

        let records = parser::records_from_table(table)?;
        tracing::info!(path = %path.display(), records = records.len(), "ledger loaded");
        Ok(Self::new(records))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, LedgerError> {
        let table = parser::read_csv(reader)?;
        Ok(Self::new(parser::records_from_table(table)?))
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dated `date`, in ledger order.
    pub fn day(&self, date: NaiveDate) -> Vec<&ActivityRecord> {
        self.records
            .iter()
            .filter(|record| record.date == date)
            .collect()
    }

    pub fn within(&self, window: &ReportingWindow) -> ActivityDataset {
        Self::new(
            self.records
                .iter()
                .filter(|record| window.contains(record.date))
                .cloned()
                .collect(),
        )
    }

    /// Stable re-sort by date; same-day records keep ledger order.
    pub fn sorted_by_date(&self) -> Vec<&ActivityRecord> {
        let mut sorted: Vec<&ActivityRecord> = self.records.iter().collect();
        sorted.sort_by_key(|record| record.date);
        sorted
    }

    pub fn total_value(&self) -> f64 {
        self.records.iter().map(|record| record.total_value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str =
        "FECHA,ZONA,ACTIVIDAD,DESCRIPCION,UNIDAD_MEDIDA,CANTIDAD,VALOR_UNITARIO,VALOR_TOTAL,TIPO_ACT,ID_ACTIVIDAD\n";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn csv_ledger_loads_and_cleans_descriptions() {
        let csv = format!(
            "{HEADER}2025-11-03,Muelle 1,Cambio de teja,Cambio \u{2014} teja “rota”\u{200b},ml,2,\"$ 30,000\",60000,CUBIERTAS,A-1\n\
03/11/2025,Muelle 2,,Destape,UND,1,50000,50000,HIDROSANITARIO,\n"
        );
        let dataset = ActivityDataset::from_csv_reader(Cursor::new(csv)).expect("ledger parses");

        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.date, date(2025, 11, 3));
        assert_eq!(first.description, "Cambio - teja \"rota\"");
        assert_eq!(first.unit, UnitOfMeasure::Linear);
        assert_eq!(first.unit_price, 30_000.0);
        assert_eq!(first.item.as_deref(), Some("Cambio de teja"));
        assert_eq!(first.activity_id.as_deref(), Some("A-1"));

        let second = &dataset.records()[1];
        assert_eq!(second.date, date(2025, 11, 3));
        assert!(second.item.is_none());
        assert!(second.activity_id.is_none());
        assert_eq!(second.unit, UnitOfMeasure::Count);
    }

    #[test]
    fn missing_required_columns_fail_the_load() {
        let csv = "FECHA,ZONA,DESCRIPCION\n2025-11-03,Muelle 1,algo\n";
        let error = ActivityDataset::from_csv_reader(Cursor::new(csv)).expect_err("must fail");
        match error {
            LedgerError::MissingColumns(columns) => {
                assert!(columns.contains(&"VALOR_TOTAL".to_string()));
                assert!(columns.contains(&"TIPO_ACT".to_string()));
                assert!(!columns.contains(&"ZONA".to_string()));
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn rows_with_unreadable_dates_are_skipped() {
        let csv = format!(
            "{HEADER}no-date,Muelle 1,,x,ML,1,1,1,CUB,\n2025-11-04,Muelle 1,,y,ML,1,1,1,CUB,\n"
        );
        let dataset = ActivityDataset::from_csv_reader(Cursor::new(csv)).expect("ledger parses");
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].date, date(2025, 11, 4));
    }

    #[test]
    fn day_and_window_subsets_keep_ledger_order() {
        let csv = format!(
            "{HEADER}2025-11-04,B,,b,ML,1,1,10,CUB,\n2025-10-20,A,,a,ML,1,1,5,CUB,\n\
2025-11-03,C,,c,M2,1,1,7,CUB,\n2025-11-04,D,,d,M3,1,1,3,CUB,\n"
        );
        let dataset = ActivityDataset::from_csv_reader(Cursor::new(csv)).expect("ledger parses");
        let window = ReportingWindow::for_month(2025, 11).expect("window");

        let filtered = dataset.within(&window);
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.total_value(), 20.0);

        let zones: Vec<&str> = filtered
            .day(date(2025, 11, 4))
            .iter()
            .map(|record| record.zone.as_str())
            .collect();
        assert_eq!(zones, ["B", "D"]);

        let sorted: Vec<&str> = filtered
            .sorted_by_date()
            .iter()
            .map(|record| record.zone.as_str())
            .collect();
        assert_eq!(sorted, ["C", "B", "D"]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let error = ActivityDataset::from_path("ledger.json", "BD").expect_err("must fail");
        assert!(matches!(error, LedgerError::UnsupportedFormat(_)));
    }

    #[test]
    fn unit_codes_round_trip() {
        for unit in UnitOfMeasure::ordered() {
            assert_eq!(UnitOfMeasure::parse(unit.code()), unit);
        }
        assert_eq!(
            UnitOfMeasure::parse(" gl "),
            UnitOfMeasure::Other("gl".to_string())
        );
    }
}
