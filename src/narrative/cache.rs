use crate::ledger::{excel_serial_date, parse_date};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};

const DATE_HEADER: &str = "FECHA";
const SUMMARY_HEADER: &str = "RESUMEN";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum SummaryStoreError {
    #[error("failed to read summary store: {0}")]
    Read(#[from] calamine::Error),
    #[error("summary store has no FECHA/RESUMEN header row")]
    MissingColumns,
    #[error("failed to prepare summary store directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write summary store: {0}")]
    Xlsx(#[from] XlsxError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadyPresent,
    Rejected,
}

/// Sheet contents as read, written back cell for cell on every save.
#[derive(Debug, Clone, PartialEq)]
struct SheetRows {
    origin: (u32, u16),
    headers: Vec<Data>,
    date_column: usize,
    summary_column: usize,
    rows: Vec<Vec<Data>>,
}

impl Default for SheetRows {
    fn default() -> Self {
        Self {
            origin: (0, 0),
            headers: vec![
                Data::String(DATE_HEADER.to_string()),
                Data::String(SUMMARY_HEADER.to_string()),
            ],
            date_column: 0,
            summary_column: 1,
            rows: Vec::new(),
        }
    }
}

/// Append-only `FECHA`/`RESUMEN` workbook keyed by date.
///
/// Rows the index cannot use (text in `FECHA`, blank summaries, repeated
/// dates) stay in the file untouched.
#[derive(Debug, Clone)]
pub struct DailySummaryStore {
    path: PathBuf,
    sheet: SheetRows,
    entries: Vec<(NaiveDate, String)>,
}

impl DailySummaryStore {
    /// Loads the store. A missing file is an empty store; an unreadable one
    /// is reported and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sheet = if path.exists() {
            match read_sheet(&path) {
                Ok(sheet) => sheet,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "summary store unreadable, starting empty");
                    SheetRows::default()
                }
            }
        } else {
            SheetRows::default()
        };
        let entries = index_entries(&sheet);
        tracing::debug!(
            path = %path.display(),
            rows = sheet.rows.len(),
            entries = entries.len(),
            "summary store opened"
        );
        Self {
            path,
            sheet,
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_date, _)| *entry_date == date)
            .map(|(_, summary)| summary.as_str())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    /// Appends and persists `summary` unless it is blank or `date` already
    /// has an entry. Existing rows are never overwritten.
    pub fn save_summary(
        &mut self,
        date: NaiveDate,
        summary: &str,
    ) -> Result<SaveOutcome, SummaryStoreError> {
        let summary = summary.trim();
        if summary.is_empty() {
            tracing::warn!(%date, "refusing to store an empty summary");
            return Ok(SaveOutcome::Rejected);
        }
        if self.contains(date) {
            tracing::info!(%date, "summary already stored, skipping");
            return Ok(SaveOutcome::AlreadyPresent);
        }

        let width = self.sheet.headers.len();
        let mut row = vec![Data::Empty; width];
        row[self.sheet.date_column] = Data::String(date.format(DATE_FORMAT).to_string());
        row[self.sheet.summary_column] = Data::String(summary.to_string());
        self.sheet.rows.push(row);
        self.entries.push((date, summary.to_string()));

        self.persist()?;
        tracing::info!(%date, path = %self.path.display(), "summary stored");
        Ok(SaveOutcome::Saved)
    }

    fn persist(&self) -> Result<(), SummaryStoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SummaryStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let (first_row, first_column) = self.sheet.origin;
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_column_width(first_column + self.sheet.date_column as u16, 12)?;
        sheet.set_column_width(first_column + self.sheet.summary_column as u16, 100)?;

        let all_rows = std::iter::once(&self.sheet.headers).chain(self.sheet.rows.iter());
        for (offset, cells) in all_rows.enumerate() {
            let row = first_row + offset as u32;
            for (index, cell) in cells.iter().enumerate() {
                let column = first_column + index as u16;
                match cell {
                    Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => {
                        sheet.write_string(row, column, text.as_str())?;
                    }
                    Data::Float(value) => {
                        sheet.write_number(row, column, *value)?;
                    }
                    Data::Int(value) => {
                        sheet.write_number(row, column, *value as f64)?;
                    }
                    Data::Bool(value) => {
                        sheet.write_boolean(row, column, *value)?;
                    }
                    Data::DateTime(value) => {
                        sheet.write_number_with_format(row, column, value.as_f64(), &date_format)?;
                    }
                    Data::Error(_) | Data::Empty => {}
                }
            }
        }
        workbook.save(&self.path)?;
        Ok(())
    }
}

fn read_sheet(path: &Path) -> Result<SheetRows, SummaryStoreError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(SheetRows::default()),
    };
    let Some(origin) = range.start() else {
        return Ok(SheetRows::default());
    };

    let mut rows = range.rows();
    let Some(headers) = rows.next() else {
        return Ok(SheetRows::default());
    };
    let position = |name: &str| {
        headers
            .iter()
            .position(|cell| cell.to_string().trim().eq_ignore_ascii_case(name))
    };
    let (Some(date_column), Some(summary_column)) = (position(DATE_HEADER), position(SUMMARY_HEADER))
    else {
        return Err(SummaryStoreError::MissingColumns);
    };

    Ok(SheetRows {
        origin: (origin.0, origin.1 as u16),
        headers: headers.to_vec(),
        date_column,
        summary_column,
        rows: rows.map(<[Data]>::to_vec).collect(),
    })
}

/// First row per date with a readable `FECHA` and a non-blank summary.
fn index_entries(sheet: &SheetRows) -> Vec<(NaiveDate, String)> {
    let mut entries: Vec<(NaiveDate, String)> = Vec::new();
    for row in &sheet.rows {
        let date = row.get(sheet.date_column).and_then(cell_date);
        let summary = row
            .get(sheet.summary_column)
            .map(|cell| cell.to_string().trim().to_string())
            .unwrap_or_default();
        match date {
            Some(date) if !summary.is_empty() => {
                if !entries.iter().any(|(existing, _)| *existing == date) {
                    entries.push((date, summary));
                }
            }
            _ => tracing::debug!(?row, "summary row kept but not indexed"),
        }
    }
    entries
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(value) => excel_serial_date(value.as_f64()),
        Data::Float(value) => excel_serial_date(*value),
        Data::Int(value) => excel_serial_date(*value as f64),
        Data::String(text) | Data::DateTimeIso(text) => parse_date(text.trim()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed(path: &Path, rows: &[(&str, &str)]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (index, (first, second)) in rows.iter().enumerate() {
            let row = index as u32;
            sheet.write_string(row, 0, *first).expect("first column");
            if !second.is_empty() {
                sheet.write_string(row, 1, *second).expect("second column");
            }
        }
        workbook.save(path).expect("seed workbook");
    }

    fn first_sheet(path: &Path) -> Vec<Vec<Data>> {
        let mut workbook = open_workbook_auto(path).expect("workbook");
        let range = workbook
            .worksheet_range_at(0)
            .expect("sheet")
            .expect("range");
        range.rows().map(<[Data]>::to_vec).collect()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).expect("date")
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let dir = tempdir().expect("tempdir");
        let store = DailySummaryStore::open(dir.path().join("none.xlsx"));
        assert!(store.is_empty());
        assert_eq!(store.get(date(3)), None);
    }

    #[test]
    fn saved_summaries_survive_a_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("resumenes.xlsx");

        let mut store = DailySummaryStore::open(&path);
        assert_eq!(
            store.save_summary(date(3), "  Se atendieron dos muelles. ").expect("save"),
            SaveOutcome::Saved
        );
        assert_eq!(
            store.save_summary(date(4), "Cambio de tejas.").expect("save"),
            SaveOutcome::Saved
        );
        assert!(path.exists());

        let reopened = DailySummaryStore::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(date(3)), Some("Se atendieron dos muelles."));
        assert_eq!(reopened.get(date(4)), Some("Cambio de tejas."));
    }

    #[test]
    fn existing_dates_are_never_overwritten() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        let mut store = DailySummaryStore::open(&path);
        store.save_summary(date(3), "primero").expect("save");
        assert_eq!(
            store.save_summary(date(3), "segundo").expect("save"),
            SaveOutcome::AlreadyPresent
        );

        let reopened = DailySummaryStore::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(date(3)), Some("primero"));
    }

    #[test]
    fn blank_summaries_are_rejected_without_writing() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        let mut store = DailySummaryStore::open(&path);
        assert_eq!(
            store.save_summary(date(3), " \n ").expect("save"),
            SaveOutcome::Rejected
        );
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_resets_to_empty() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        std::fs::write(&path, b"not a workbook").expect("write");

        let mut store = DailySummaryStore::open(&path);
        assert!(store.is_empty());
        store.save_summary(date(5), "nuevo").expect("save");
        assert_eq!(DailySummaryStore::open(&path).get(date(5)), Some("nuevo"));
    }

    #[test]
    fn appending_keeps_rows_the_index_skips() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        seed(
            &path,
            &[
                ("FECHA", "RESUMEN"),
                ("2025-11-03", "uno"),
                ("Semana 45", "nota escrita a mano"),
                ("2025-11-04", ""),
            ],
        );

        let mut store = DailySummaryStore::open(&path);
        assert_eq!(store.len(), 1);
        assert!(!store.contains(date(4)));
        assert_eq!(
            store.save_summary(date(5), "nuevo").expect("save"),
            SaveOutcome::Saved
        );

        let rows = first_sheet(&path);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1][0], Data::String("2025-11-03".to_string()));
        assert_eq!(rows[2][0], Data::String("Semana 45".to_string()));
        assert_eq!(rows[2][1], Data::String("nota escrita a mano".to_string()));
        assert_eq!(rows[3][0], Data::String("2025-11-04".to_string()));
        assert_eq!(rows[4][0], Data::String("2025-11-05".to_string()));
        assert_eq!(rows[4][1], Data::String("nuevo".to_string()));

        let reopened = DailySummaryStore::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(date(3)), Some("uno"));
        assert_eq!(reopened.get(date(5)), Some("nuevo"));
    }

    #[test]
    fn repeated_dates_stay_on_disk_and_the_first_one_wins() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        seed(
            &path,
            &[
                ("FECHA", "RESUMEN"),
                ("2025-11-03", "primero"),
                ("2025-11-03", "repetido"),
            ],
        );

        let mut store = DailySummaryStore::open(&path);
        assert_eq!(store.get(date(3)), Some("primero"));
        store.save_summary(date(6), "otro").expect("save");

        let rows = first_sheet(&path);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2][1], Data::String("repetido".to_string()));
    }

    #[test]
    fn sheet_without_summary_header_is_a_typed_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        seed(&path, &[("FECHA", "NOTAS"), ("2025-11-03", "uno")]);

        assert!(matches!(
            read_sheet(&path),
            Err(SummaryStoreError::MissingColumns)
        ));
        assert!(DailySummaryStore::open(&path).is_empty());
    }

    #[test]
    fn unreadable_file_is_a_read_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("resumenes.xlsx");
        std::fs::write(&path, b"not a workbook").expect("write");
        assert!(matches!(read_sheet(&path), Err(SummaryStoreError::Read(_))));
    }
}
