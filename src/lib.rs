pub mod config;
pub mod error;
pub mod ledger;
pub mod locale;
pub mod narrative;
pub mod pdf;
pub mod pipeline;
pub mod telemetry;
pub mod window;
pub mod workbook;
