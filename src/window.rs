use crate::locale;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Billing day that opens a cycle in the previous month.
pub const CYCLE_START_DAY: u32 = 26;
/// Billing day that closes a cycle in the target month.
pub const CYCLE_END_DAY: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("month {0} is outside 1-12")]
    InvalidMonth(u32),
    #[error("year {0} is outside 1900-2100")]
    InvalidYear(i32),
}

/// Contiguous billing cycle from the 26th of the prior month through the
/// 25th of the target month, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    year: i32,
    month: u32,
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportingWindow {
    pub fn for_month(year: i32, month: u32) -> Result<Self, WindowError> {
        if !(1..=12).contains(&month) {
            return Err(WindowError::InvalidMonth(month));
        }
        if !(1900..=2100).contains(&year) {
            return Err(WindowError::InvalidYear(year));
        }

        let (previous_year, previous_month) = previous_month(year, month);
        let start = NaiveDate::from_ymd_opt(previous_year, previous_month, CYCLE_START_DAY)
            .ok_or(WindowError::InvalidMonth(previous_month))?;
        let end = NaiveDate::from_ymd_opt(year, month, CYCLE_END_DAY)
            .ok_or(WindowError::InvalidMonth(month))?;

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn month_name(&self) -> &'static str {
        locale::month_name(self.month).unwrap_or_default()
    }

    pub fn previous_month_name(&self) -> &'static str {
        locale::month_name(self.start.month()).unwrap_or_default()
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn november_window_spans_october_26_to_november_25() {
        let window = ReportingWindow::for_month(2025, 11).expect("window");
        assert_eq!(window.start(), date(2025, 10, 26));
        assert_eq!(window.end(), date(2025, 11, 25));
        assert_eq!(window.len_days(), 31);
        assert_eq!(window.days().count(), 31);
        assert_eq!(window.month_name(), "noviembre");
        assert_eq!(window.previous_month_name(), "octubre");
    }

    #[test]
    fn january_window_starts_in_previous_year() {
        let window = ReportingWindow::for_month(2026, 1).expect("window");
        assert_eq!(window.start(), date(2025, 12, 26));
        assert_eq!(window.end(), date(2026, 1, 25));
        assert_eq!(window.previous_month_name(), "diciembre");
    }

    #[test]
    fn march_window_length_follows_february() {
        assert_eq!(ReportingWindow::for_month(2024, 3).unwrap().len_days(), 29);
        assert_eq!(ReportingWindow::for_month(2025, 3).unwrap().len_days(), 28);
    }

    #[test]
    fn every_window_is_between_28_and_31_days_and_bounded() {
        for year in [1999, 2000, 2023, 2024, 2025] {
            for month in 1..=12 {
                let window = ReportingWindow::for_month(year, month).expect("window");
                assert!((28..=31).contains(&window.len_days()));
                assert_eq!(window.start().day(), 26);
                assert_eq!(window.end().day(), 25);
                assert_eq!(window.end().month(), month);
                assert!(window.days().all(|day| window.contains(day)));
            }
        }
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(
            ReportingWindow::for_month(2025, 13),
            Err(WindowError::InvalidMonth(13))
        );
        assert_eq!(
            ReportingWindow::for_month(1800, 5),
            Err(WindowError::InvalidYear(1800))
        );
    }
}
