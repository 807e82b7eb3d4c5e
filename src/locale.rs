//! Spanish (Colombia) calendar names and number formatting shared by the
//! PDF, the spreadsheet and the narrative generators.

use chrono::{Datelike, NaiveDate, Weekday};

pub const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const WEEKDAYS: [&str; 7] = [
    "lunes",
    "martes",
    "miércoles",
    "jueves",
    "viernes",
    "sábado",
    "domingo",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a month number (1-12), a Spanish month name, or a prefix of at least 3 letters")]
pub struct MonthParseError(pub String);

/// Lowercase Spanish name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|index| MONTHS.get(index as usize))
        .copied()
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_monday() as usize]
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Accepts `11`, `noviembre`, `Noviembre` or any prefix of 3+ letters (`nov`).
pub fn parse_month(raw: &str) -> Result<u32, MonthParseError> {
    let value = raw.trim().to_lowercase();

    if !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit()) {
        return match value.parse::<u32>() {
            Ok(month @ 1..=12) => Ok(month),
            _ => Err(MonthParseError(raw.trim().to_string())),
        };
    }

    if let Some(index) = MONTHS.iter().position(|name| *name == value) {
        return Ok(index as u32 + 1);
    }

    if value.chars().count() >= 3 {
        if let Some(index) = MONTHS.iter().position(|name| name.starts_with(&value)) {
            return Ok(index as u32 + 1);
        }
    }

    Err(MonthParseError(raw.trim().to_string()))
}

/// Rounds to whole units and groups thousands with `.` (`150000.0` -> `150.000`).
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_currency(value: f64) -> String {
    format!("${}", format_thousands(value))
}

/// Quantities keep their decimals but drop a trailing `.0`.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// `dd-mm-yyyy`, the table's date column format.
pub fn format_day_month_year(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// `Lunes 3 de noviembre de 2025`.
pub fn long_date(date: NaiveDate) -> String {
    let month = month_name(date.month()).unwrap_or_default();
    format!(
        "{} {} de {} de {}",
        capitalize(weekday_name(date.weekday())),
        date.day(),
        month,
        date.year()
    )
}
