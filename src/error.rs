use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::narrative::{SummaryError, SummaryStoreError};
use crate::pdf::CanvasError;
use crate::pipeline::PipelineError;
use crate::telemetry::TelemetryError;
use crate::window::WindowError;
use crate::workbook::WorkbookError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Window(WindowError),
    Summary(SummaryError),
    Pipeline(PipelineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Window(err) => write!(f, "invalid reporting period: {}", err),
            AppError::Summary(err) => write!(f, "summary service error: {}", err),
            AppError::Pipeline(err) => write!(f, "report error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Window(err) => Some(err),
            AppError::Summary(err) => Some(err),
            AppError::Pipeline(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<WindowError> for AppError {
    fn from(value: WindowError) -> Self {
        Self::Window(value)
    }
}

impl From<SummaryError> for AppError {
    fn from(value: SummaryError) -> Self {
        Self::Summary(value)
    }
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<CanvasError> for AppError {
    fn from(value: CanvasError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<WorkbookError> for AppError {
    fn from(value: WorkbookError) -> Self {
        Self::Pipeline(value.into())
    }
}

impl From<SummaryStoreError> for AppError {
    fn from(value: SummaryStoreError) -> Self {
        Self::Pipeline(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn fatal_pipeline_errors_keep_their_message_and_source() {
        let missing = LedgerError::MissingColumns(vec!["VALOR_TOTAL".to_string()]);
        let err = AppError::from(missing);
        assert_eq!(
            err.to_string(),
            "report error: ledger is missing required columns: VALOR_TOTAL"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn config_errors_are_labelled() {
        let err = AppError::from(ConfigError::MissingVariable("GEMINI_API_KEY"));
        assert_eq!(
            err.to_string(),
            "configuration error: GEMINI_API_KEY must be set"
        );
    }
}
