use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_LEDGER_PATH: &str = "BD/EXCEL/ACTIVIDADES/BD_ACTIVIDADES.xlsx";
pub const DEFAULT_LEDGER_SHEET: &str = "BD";
pub const DEFAULT_PHOTO_ROOT: &str = "BD/FOTOS/ACTIVIDADES_FOTOS";
pub const DEFAULT_HEADER_IMAGE: &str = "templates/ENCABEZADO/encabezado.jpeg";
pub const DEFAULT_FOOTER_IMAGE: &str = "templates/FOOTER/footer.jpeg";
pub const DEFAULT_OUTPUT_DIR: &str = "BD/INFORMES/SPRBUN";
pub const DEFAULT_SUMMARIES_PATH: &str = "BD/EXCEL/RESUMENES/resumenes_mensuales.xlsx";
pub const DEFAULT_REPORT_LABEL: &str = "MANTENIMIENTO";
pub const DEFAULT_PHOTO_MAX_EDGE: u32 = 1600;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Distinguishes runtime behavior for different stages of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub report: ReportSettings,
    pub contract: ContractProfile,
    pub gemini: GeminiConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));
        let log_level = var_or("APP_LOG_LEVEL", "info");

        let photo_max_edge = match env::var("REPORT_PHOTO_MAX_EDGE") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidNumber {
                    variable: "REPORT_PHOTO_MAX_EDGE",
                    value: raw,
                })?,
            Err(_) => DEFAULT_PHOTO_MAX_EDGE,
        };

        let label = var_or("REPORT_LABEL", DEFAULT_REPORT_LABEL);
        if label.trim().is_empty() || label.contains(['/', '\\']) {
            return Err(ConfigError::InvalidLabel(label));
        }

        let report = ReportSettings {
            ledger_path: PathBuf::from(var_or("REPORT_LEDGER_PATH", DEFAULT_LEDGER_PATH)),
            ledger_sheet: var_or("REPORT_LEDGER_SHEET", DEFAULT_LEDGER_SHEET),
            photo_root: PathBuf::from(var_or("REPORT_PHOTO_ROOT", DEFAULT_PHOTO_ROOT)),
            header_image: PathBuf::from(var_or("REPORT_HEADER_IMAGE", DEFAULT_HEADER_IMAGE)),
            footer_image: PathBuf::from(var_or("REPORT_FOOTER_IMAGE", DEFAULT_FOOTER_IMAGE)),
            output_dir: PathBuf::from(var_or("REPORT_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            summaries_path: PathBuf::from(var_or("REPORT_SUMMARIES_PATH", DEFAULT_SUMMARIES_PATH)),
            label: label.trim().to_string(),
            photo_max_edge,
        };

        let defaults = ContractProfile::default();
        let contract = ContractProfile {
            service: var_or("REPORT_SERVICE", &defaults.service),
            site: var_or("REPORT_SITE", &defaults.site),
            contractor: var_or("REPORT_CONTRACTOR", &defaults.contractor),
        };

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: var_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            endpoint: var_or("GEMINI_ENDPOINT", DEFAULT_GEMINI_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
        };

        Ok(Self {
            environment,
            report,
            contract,
            gemini,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Input and output locations for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub ledger_path: PathBuf,
    pub ledger_sheet: String,
    pub photo_root: PathBuf,
    pub header_image: PathBuf,
    pub footer_image: PathBuf,
    pub output_dir: PathBuf,
    pub summaries_path: PathBuf,
    pub label: String,
    pub photo_max_edge: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            ledger_sheet: DEFAULT_LEDGER_SHEET.to_string(),
            photo_root: PathBuf::from(DEFAULT_PHOTO_ROOT),
            header_image: PathBuf::from(DEFAULT_HEADER_IMAGE),
            footer_image: PathBuf::from(DEFAULT_FOOTER_IMAGE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            summaries_path: PathBuf::from(DEFAULT_SUMMARIES_PATH),
            label: DEFAULT_REPORT_LABEL.to_string(),
            photo_max_edge: DEFAULT_PHOTO_MAX_EDGE,
        }
    }
}

/// Contract texts printed on the cover and used by the general summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractProfile {
    pub service: String,
    pub site: String,
    pub contractor: String,
}

impl Default for ContractProfile {
    fn default() -> Self {
        Self {
            service: "MANTENIMIENTO PERMANENTE DE CUBIERTAS Y REDES SANITARIAS".to_string(),
            site: "SOCIEDAD PORTUARIA REGIONAL DE BUENAVENTURA - ZONAS CONCESIONADAS Y EXTERNAS"
                .to_string(),
            contractor: "ALFA MONTAJES Y CUBIERTAS S.A.S.".to_string(),
        }
    }
}

/// Credentials and endpoint of the text-generation API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl GeminiConfig {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingVariable("GEMINI_API_KEY"))
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(&'static str),
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    InvalidLabel(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => write!(f, "{name} must be set"),
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer, got '{value}'")
            }
            ConfigError::InvalidLabel(label) => write!(
                f,
                "REPORT_LABEL must be a non-empty file-name fragment, got '{label}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
