//! One report run: window, ledger, narrative, PDF and spreadsheet, in that
//! order. Every fatal condition surfaces before the first output file is
//! written.

use crate::config::{ContractProfile, ReportSettings};
use crate::ledger::normalizer::{normalize_paragraphs, normalize_text};
use crate::ledger::{ActivityDataset, LedgerError};
use crate::narrative::{
    general_summary, DailySummarizer, DailySummaryStore, SaveOutcome, SummaryGateway,
    SummaryStoreError, MISSING_DAILY_SUMMARY,
};
use crate::pdf::{
    ActivityReport, BrandingAssets, Canvas, CanvasError, CoverPage, DayTable, PageGeometry,
    PhotoStore,
};
use crate::window::ReportingWindow;
use crate::workbook::{ExcelReportWriter, WorkbookError};
use chrono::NaiveDate;
use std::path::PathBuf;

pub const PDF_FILE_NAME: &str = "INFORME_HEADER_FOOTER.pdf";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error(transparent)]
    SummaryStore(#[from] SummaryStoreError),
    #[error("failed to create output directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no activities recorded between {start} and {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub pdf_path: PathBuf,
    pub workbook_path: PathBuf,
    pub days: usize,
    pub rows: usize,
    pub photos: usize,
    pub pages: usize,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateOutcome {
    pub saved: usize,
    pub cached: usize,
    pub failed: usize,
    pub empty_days: usize,
}

fn load_window(
    settings: &ReportSettings,
    window: &ReportingWindow,
) -> Result<ActivityDataset, PipelineError> {
    let dataset = ActivityDataset::from_path(&settings.ledger_path, &settings.ledger_sheet)?
        .within(window);
    if dataset.is_empty() {
        return Err(PipelineError::EmptyWindow {
            start: window.start(),
            end: window.end(),
        });
    }
    tracing::info!(
        start = %window.start(),
        end = %window.end(),
        records = dataset.len(),
        "ledger filtered to reporting window"
    );
    Ok(dataset)
}

/// Renders the PDF and the spreadsheet for `window`.
pub fn generate_report(
    settings: &ReportSettings,
    contract: &ContractProfile,
    window: &ReportingWindow,
) -> Result<ReportOutcome, PipelineError> {
    let assets = BrandingAssets {
        header: settings.header_image.clone(),
        footer: settings.footer_image.clone(),
    };
    let canvas = Canvas::begin_document(
        PageGeometry::oficio_landscape(),
        &assets,
        settings.photo_max_edge,
    )?;
    let dataset = load_window(settings, window)?;
    let summaries = DailySummaryStore::open(&settings.summaries_path);

    let contract = ContractProfile {
        service: normalize_text(&contract.service),
        site: normalize_text(&contract.site),
        contractor: normalize_text(&contract.contractor),
    };
    let summary = normalize_paragraphs(&general_summary(&dataset, &contract));

    let mut report = ActivityReport::new(canvas, PhotoStore::new(&settings.photo_root));
    report.render_cover(&CoverPage {
        year: window.year(),
        month_name: window.month_name(),
        previous_month_name: window.previous_month_name(),
        first_day: window.start(),
        last_day: window.end(),
        summary: &summary,
        contract: &contract,
    });

    let mut outcome = ReportOutcome {
        pdf_path: settings.output_dir.join(PDF_FILE_NAME),
        workbook_path: PathBuf::new(),
        days: 0,
        rows: 0,
        photos: 0,
        pages: 0,
        total: 0.0,
    };

    for (index, date) in window.days().enumerate() {
        let records = dataset.day(date);
        let description = match summaries.get(date) {
            Some(text) => normalize_paragraphs(text),
            None => MISSING_DAILY_SUMMARY.to_string(),
        };
        let stats = report.render_day_table(&DayTable {
            sequence: index + 1,
            year: window.year(),
            date,
            records: &records,
            service_description: Some(description.as_str()),
            new_page: true,
        });
        outcome.days += 1;
        outcome.rows += stats.rows;
        outcome.photos += stats.photos;
        outcome.total += stats.total;
    }

    std::fs::create_dir_all(&settings.output_dir).map_err(|source| PipelineError::Io {
        path: settings.output_dir.clone(),
        source,
    })?;
    report.save(&outcome.pdf_path)?;
    outcome.pages = report.canvas().page_count();
    tracing::info!(
        path = %outcome.pdf_path.display(),
        pages = outcome.pages,
        rows = outcome.rows,
        "report written"
    );

    outcome.workbook_path =
        ExcelReportWriter::new(&settings.output_dir, &settings.label).write(&dataset, window)?;
    Ok(outcome)
}

/// Fills the daily-summary store for every day of `window` that has
/// activities and no stored entry. Backend failures are counted, never
/// fatal.
pub fn populate_daily_summaries(
    settings: &ReportSettings,
    window: &ReportingWindow,
    gateway: Box<dyn SummaryGateway>,
) -> Result<PopulateOutcome, PipelineError> {
    let dataset = load_window(settings, window)?;
    let mut store = DailySummaryStore::open(&settings.summaries_path);
    let summarizer = DailySummarizer::new(gateway);
    let mut outcome = PopulateOutcome::default();

    for date in window.days() {
        let records = dataset.day(date);
        if records.is_empty() {
            outcome.empty_days += 1;
            continue;
        }
        if store.contains(date) {
            outcome.cached += 1;
            continue;
        }

        match summarizer.daily_summary(date, &records) {
            Some(text) => match store.save_summary(date, &text)? {
                SaveOutcome::Saved => outcome.saved += 1,
                SaveOutcome::AlreadyPresent => outcome.cached += 1,
                SaveOutcome::Rejected => outcome.failed += 1,
            },
            None => outcome.failed += 1,
        }
    }

    tracing::info!(
        saved = outcome.saved,
        cached = outcome.cached,
        failed = outcome.failed,
        "daily summaries populated"
    );
    Ok(outcome)
}
