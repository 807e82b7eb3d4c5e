//! Prose for the report: a deterministic general summary of the whole
//! window and network-generated summaries per day, cached on disk.

pub mod cache;
pub mod gemini;
pub mod general;

use crate::ledger::ActivityRecord;
use chrono::NaiveDate;
use std::fmt::Debug;

pub use cache::{DailySummaryStore, SaveOutcome, SummaryStoreError};
pub use gemini::GeminiClient;
pub use general::{general_summary, SummaryMetrics};

/// Printed for days without a cached summary.
pub const MISSING_DAILY_SUMMARY: &str = "Sin resumen disponible.";

const DESCRIPTION_SEPARATOR: &str = "\n---\n";

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summary request failed: {0}")]
    Backend(String),
    #[error("summary service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("summary service returned no text")]
    EmptyResponse,
    #[error("summary runtime unavailable: {0}")]
    Runtime(String),
}

/// Text-generation backend. One call per prompt, no retries.
pub trait SummaryGateway: Debug {
    fn generate(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Turns one day's activities into a short narrative through a
/// [`SummaryGateway`].
#[derive(Debug)]
pub struct DailySummarizer {
    gateway: Box<dyn SummaryGateway>,
}

impl DailySummarizer {
    pub fn new(gateway: Box<dyn SummaryGateway>) -> Self {
        Self { gateway }
    }

    /// `None` when the day has no activities or the backend fails; callers
    /// fall back to [`MISSING_DAILY_SUMMARY`].
    pub fn daily_summary(&self, date: NaiveDate, records: &[&ActivityRecord]) -> Option<String> {
        if records.is_empty() {
            return None;
        }

        let prompt = build_daily_prompt(records);
        tracing::info!(%date, descriptions = records.len(), "requesting daily summary");
        match self.gateway.generate(&prompt) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(%date, "daily summary came back empty");
                None
            }
            Err(err) => {
                tracing::warn!(%date, error = %err, "daily summary failed");
                None
            }
        }
    }
}

/// Distinct zones in order of first appearance.
pub fn distinct_zones<'a>(records: &[&'a ActivityRecord]) -> Vec<&'a str> {
    let mut zones: Vec<&str> = Vec::new();
    for record in records {
        let zone = record.zone.trim();
        if !zone.is_empty() && !zones.contains(&zone) {
            zones.push(zone);
        }
    }
    zones
}

pub fn build_daily_prompt(records: &[&ActivityRecord]) -> String {
    let zones = distinct_zones(records).join(", ");
    let descriptions = records
        .iter()
        .map(|record| record.description.trim())
        .filter(|description| !description.is_empty())
        .collect::<Vec<_>>()
        .join(DESCRIPTION_SEPARATOR);

    format!(
        "INSTRUCCIÓN:\n\
A continuación se proporcionan varias descripciones de mantenimiento, separadas por el delimitador '---'.\n\
Estas descripciones están asociadas a las siguientes ubicaciones (zonas): {zones}.\n\
Genera un resumen único de máximo 150 palabras, coherente y conciso, que deje claro que la información \
resume los reportes de las zonas listadas ({zones}). Ignora los valores vacíos o 'nan'.\n\
El resumen debe estar en español.\n\
\n\
--- DESCRIPCIONES DE ENTRADA ---\n\
{descriptions}"
    )
}
