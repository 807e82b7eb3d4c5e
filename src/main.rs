use clap::{Args, Parser, Subcommand};
use maintenance_report::config::AppConfig;
use maintenance_report::error::AppError;
use maintenance_report::locale;
use maintenance_report::narrative::GeminiClient;
use maintenance_report::pipeline;
use maintenance_report::telemetry;
use maintenance_report::window::ReportingWindow;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "maintenance-report",
    about = "Build the monthly maintenance report (PDF and spreadsheet) from the activity ledger",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the PDF report and the spreadsheet for one billing month
    Report(ReportArgs),
    /// Fill the daily-summary store through the text-generation API
    Summaries(PeriodArgs),
    /// Print the billing window of a month
    Window(PeriodArgs),
}

#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
struct PeriodArgs {
    /// Calendar year of the month that closes the window
    #[arg(long)]
    year: i32,
    /// Month number or Spanish name (`11`, `noviembre`, `nov`)
    #[arg(long, value_parser = parse_month)]
    month: u32,
}

impl PeriodArgs {
    fn window(&self) -> Result<ReportingWindow, AppError> {
        Ok(ReportingWindow::for_month(self.year, self.month)?)
    }
}

#[derive(Args, Debug)]
struct ReportArgs {
    #[command(flatten)]
    period: PeriodArgs,
    /// Override the configured activity ledger (.xlsx, .ods or .csv)
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Override the configured output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(environment = ?config.environment, "configuration loaded");

    match cli.command {
        Command::Report(args) => run_report(config, args),
        Command::Summaries(period) => run_summaries(config, period),
        Command::Window(period) => run_window(period),
    }
}

fn parse_month(raw: &str) -> Result<u32, String> {
    locale::parse_month(raw).map_err(|err| err.to_string())
}

fn run_report(config: AppConfig, args: ReportArgs) -> Result<(), AppError> {
    let window = args.period.window()?;
    let mut settings = config.report;
    if let Some(ledger) = args.ledger {
        settings.ledger_path = ledger;
    }
    if let Some(output_dir) = args.output_dir {
        settings.output_dir = output_dir;
    }

    let outcome = pipeline::generate_report(&settings, &config.contract, &window)?;
    println!(
        "Informe {} {}: {} días, {} actividades, {} fotos, {} páginas, total {}",
        window.month_name(),
        window.year(),
        outcome.days,
        outcome.rows,
        outcome.photos,
        outcome.pages,
        locale::format_currency(outcome.total)
    );
    println!("PDF: {}", outcome.pdf_path.display());
    println!("Excel: {}", outcome.workbook_path.display());
    Ok(())
}

fn run_summaries(config: AppConfig, period: PeriodArgs) -> Result<(), AppError> {
    let window = period.window()?;
    let gemini = &config.gemini;
    let client = GeminiClient::new(gemini.api_key()?, &gemini.model, &gemini.endpoint)?;
    info!(model = client.model(), "summary client ready");

    let outcome = pipeline::populate_daily_summaries(&config.report, &window, Box::new(client))?;
    println!(
        "Resúmenes {} {}: {} nuevos, {} existentes, {} fallidos, {} días sin actividades",
        window.month_name(),
        window.year(),
        outcome.saved,
        outcome.cached,
        outcome.failed,
        outcome.empty_days
    );
    println!("Archivo: {}", config.report.summaries_path.display());
    Ok(())
}

fn run_window(period: PeriodArgs) -> Result<(), AppError> {
    let window = period.window()?;
    println!(
        "{} {}: {} a {} ({} días)",
        window.month_name(),
        window.year(),
        window.start(),
        window.end(),
        window.len_days()
    );
    Ok(())
}
