//! Tabular Report Writer: the `INFORME` / `BASE DATOS` spreadsheet that
//! accompanies the PDF.

use crate::ledger::{ActivityDataset, ActivityRecord, UnitOfMeasure};
use crate::window::ReportingWindow;
use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::{Path, PathBuf};

pub const REPORT_SHEET: &str = "INFORME";
pub const DATABASE_SHEET: &str = "BASE DATOS";

const LAST_REPORT_COLUMN: u16 = 6;
const CURRENCY_FORMAT: &str = "\"$\"#,##0.00_-";
const DATE_FORMAT: &str = "dd/mm/yyyy";
const DAY_HEADER_FILL: u32 = 0xD9D9D9;
const GRAND_TOTAL_FONT: u32 = 0x00008B;
const GRAND_TOTAL_FILL: u32 = 0xBDD7EE;

const REPORT_HEADERS: [&str; 7] = [
    "Fecha",
    "Área / Ubicación",
    "Actividad Realizada",
    "Unidad",
    "Cantidad",
    "Valor Unitario ($)",
    "Valor Total ($)",
];
const REPORT_WIDTHS: [u16; 7] = [12, 25, 60, 8, 10, 18, 18];

const DATABASE_HEADERS: [&str; 8] = [
    "FECHA",
    "ZONA",
    "DESCRIPCION ITEM",
    "DESCRIPCION",
    "UNIDAD_MEDIDA",
    "CANTIDAD",
    "VALOR_UNITARIO",
    "VALOR_TOTAL",
];
const DATABASE_WIDTHS: [u16; 8] = [12, 25, 35, 60, 12, 10, 18, 18];

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("no activities between {start} and {end}")]
    EmptyDataset { start: NaiveDate, end: NaiveDate },
    #[error("failed to create output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Activities of one date with their subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBlock<'a> {
    pub date: NaiveDate,
    pub records: Vec<&'a ActivityRecord>,
    pub subtotal: f64,
}

/// Groups records by date, ascending, keeping ledger order within a day.
pub fn daily_subtotals(dataset: &ActivityDataset) -> Vec<DayBlock<'_>> {
    let mut blocks: Vec<DayBlock<'_>> = Vec::new();
    for record in dataset.sorted_by_date() {
        match blocks.last_mut() {
            Some(block) if block.date == record.date => {
                block.records.push(record);
                block.subtotal += record.total_value;
            }
            _ => blocks.push(DayBlock {
                date: record.date,
                records: vec![record],
                subtotal: record.total_value,
            }),
        }
    }
    blocks
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitTotal {
    pub unit: UnitOfMeasure,
    pub quantity: f64,
    pub value: f64,
}

impl UnitTotal {
    fn fill(&self) -> u32 {
        match self.unit {
            UnitOfMeasure::Linear => 0x99CCFF,
            UnitOfMeasure::Area => 0xCC99FF,
            UnitOfMeasure::Volume => 0x99CC00,
            UnitOfMeasure::Count => 0xFFCC99,
            UnitOfMeasure::Other(_) => DAY_HEADER_FILL,
        }
    }
}

/// Quantity and value per unit in ML, M2, M3, UND order. Units outside the
/// closed set are left out of the rollup.
pub fn unit_rollup(dataset: &ActivityDataset) -> Vec<UnitTotal> {
    let mut totals: Vec<UnitTotal> = UnitOfMeasure::ordered()
        .into_iter()
        .map(|unit| UnitTotal {
            unit,
            quantity: 0.0,
            value: 0.0,
        })
        .collect();

    for record in dataset.records() {
        match totals.iter_mut().find(|total| total.unit == record.unit) {
            Some(total) => {
                total.quantity += record.quantity;
                total.value += record.total_value;
            }
            None => tracing::warn!(
                date = %record.date,
                unit = record.unit.code(),
                "unit outside ML/M2/M3/UND left out of the rollup"
            ),
        }
    }
    totals
}

/// Writes `INFORME_<LABEL>_<MES>_<AÑO>.xlsx` into an output directory.
#[derive(Debug, Clone)]
pub struct ExcelReportWriter {
    output_dir: PathBuf,
    label: String,
}

impl ExcelReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            label: label.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(&self, window: &ReportingWindow) -> String {
        format!(
            "INFORME_{}_{}_{}.xlsx",
            self.label.to_uppercase(),
            window.month_name().to_uppercase(),
            window.year()
        )
    }

    /// Writes the activities of `dataset` that fall inside `window`.
    pub fn write(
        &self,
        dataset: &ActivityDataset,
        window: &ReportingWindow,
    ) -> Result<PathBuf, WorkbookError> {
        let dataset = dataset.within(window);
        if dataset.is_empty() {
            return Err(WorkbookError::EmptyDataset {
                start: window.start(),
                end: window.end(),
            });
        }

        std::fs::create_dir_all(&self.output_dir).map_err(|source| WorkbookError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let styles = Styles::new();
        let title = format!(
            "INFORME GENERAL DE ACTIVIDADES EJECUTADAS - {} {}",
            window.month_name().to_uppercase(),
            window.year()
        );

        let mut workbook = Workbook::new();
        workbook.push_worksheet(report_sheet(&dataset, &title, &styles)?);
        workbook.push_worksheet(database_sheet(&dataset, &styles)?);

        let path = self.output_dir.join(self.file_name(window));
        workbook.save(&path)?;
        tracing::info!(path = %path.display(), rows = dataset.len(), "spreadsheet written");
        Ok(path)
    }
}

struct Styles {
    title: Format,
    day_title: Format,
    header: Format,
    centered: Format,
    wrapped_top: Format,
    wrapped_left: Format,
    date: Format,
    currency: Format,
    bold_border: Format,
    bold_currency: Format,
    border: Format,
    grand_total: Format,
}

impl Styles {
    fn new() -> Self {
        let border = Format::new().set_border(FormatBorder::Thin);
        let centered = border
            .clone()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center),
            day_title: Format::new().set_bold().set_font_size(12),
            header: border
                .clone()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_text_wrap()
                .set_background_color(Color::RGB(DAY_HEADER_FILL)),
            wrapped_top: border
                .clone()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::Top)
                .set_text_wrap(),
            wrapped_left: border
                .clone()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::Top)
                .set_text_wrap(),
            date: centered.clone().set_num_format(DATE_FORMAT),
            currency: centered.clone().set_num_format(CURRENCY_FORMAT),
            bold_border: border.clone().set_bold(),
            bold_currency: border.clone().set_bold().set_num_format(CURRENCY_FORMAT),
            grand_total: border
                .clone()
                .set_bold()
                .set_font_size(12)
                .set_font_color(Color::RGB(GRAND_TOTAL_FONT))
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(GRAND_TOTAL_FILL)),
            centered,
            border,
        }
    }

    fn unit_title(&self, fill: u32) -> Format {
        self.border
            .clone()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(Color::RGB(fill))
    }
}

fn excel_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days() as f64
}

fn report_sheet(
    dataset: &ActivityDataset,
    title: &str,
    styles: &Styles,
) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(REPORT_SHEET)?;
    for (column, width) in REPORT_WIDTHS.iter().enumerate() {
        sheet.set_column_width(column as u16, *width)?;
    }

    let mut row: u32 = 0;
    sheet.merge_range(row, 0, row, LAST_REPORT_COLUMN, title, &styles.title)?;
    row += 2;

    for block in daily_subtotals(dataset) {
        let day_title = format!("Fecha: {}", block.date.format("%d/%m/%Y"));
        sheet.merge_range(row, 0, row, LAST_REPORT_COLUMN, &day_title, &styles.day_title)?;
        row += 1;

        for (column, header) in REPORT_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(row, column as u16, *header, &styles.header)?;
        }
        row += 1;

        for record in &block.records {
            let date = record.date.format("%d/%m/%Y").to_string();
            sheet.write_string_with_format(row, 0, date, &styles.centered)?;
            sheet.write_string_with_format(row, 1, record.zone.as_str(), &styles.wrapped_top)?;
            sheet.write_string_with_format(row, 2, record.description.as_str(), &styles.wrapped_left)?;
            sheet.write_string_with_format(row, 3, record.unit.code(), &styles.centered)?;
            sheet.write_number_with_format(row, 4, record.quantity, &styles.centered)?;
            sheet.write_number_with_format(row, 5, record.unit_price, &styles.currency)?;
            sheet.write_number_with_format(row, 6, record.total_value, &styles.currency)?;
            row += 1;
        }

        for column in 0..5 {
            sheet.write_blank(row, column, &styles.border)?;
        }
        sheet.write_string_with_format(row, 5, "Total día", &styles.bold_border)?;
        sheet.write_number_with_format(row, 6, block.subtotal, &styles.bold_currency)?;
        row += 3;
    }

    let rollup = unit_rollup(dataset);
    for total in &rollup {
        let heading = format!("RESUMEN ACTIVIDADES EN {}", total.unit.code());
        sheet.merge_range(row, 0, row, 1, &heading, &styles.unit_title(total.fill()))?;
        row += 1;
        sheet.write_string_with_format(row, 0, total.unit.code(), &styles.border)?;
        sheet.write_number_with_format(row, 1, total.quantity, &styles.border)?;
        row += 1;
        sheet.write_string_with_format(row, 0, "$", &styles.border)?;
        sheet.write_number_with_format(row, 1, total.value, &styles.bold_currency)?;
        row += 2;
    }

    let grand_total: f64 = rollup.iter().map(|total| total.value).sum();
    sheet.merge_range(
        row,
        0,
        row,
        1,
        "TOTAL GENERAL DE TODAS LAS ACTIVIDADES",
        &styles.grand_total,
    )?;
    row += 1;
    sheet.write_string_with_format(row, 0, "Valor Total", &styles.border)?;
    sheet.write_number_with_format(row, 1, grand_total, &styles.bold_currency)?;

    Ok(sheet)
}

fn database_sheet(dataset: &ActivityDataset, styles: &Styles) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(DATABASE_SHEET)?;
    for (column, width) in DATABASE_WIDTHS.iter().enumerate() {
        sheet.set_column_width(column as u16, *width)?;
    }

    for (column, header) in DATABASE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, column as u16, *header, &styles.header)?;
    }

    for (index, record) in dataset.records().iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_number_with_format(row, 0, excel_serial(record.date), &styles.date)?;
        sheet.write_string_with_format(row, 1, record.zone.as_str(), &styles.wrapped_top)?;
        sheet.write_string_with_format(
            row,
            2,
            record.item.as_deref().unwrap_or_default(),
            &styles.wrapped_left,
        )?;
        sheet.write_string_with_format(row, 3, record.description.as_str(), &styles.wrapped_left)?;
        sheet.write_string_with_format(row, 4, record.unit.code(), &styles.centered)?;
        sheet.write_number_with_format(row, 5, record.quantity, &styles.centered)?;
        sheet.write_number_with_format(row, 6, record.unit_price, &styles.currency)?;
        sheet.write_number_with_format(row, 7, record.total_value, &styles.currency)?;
    }

    Ok(sheet)
}
