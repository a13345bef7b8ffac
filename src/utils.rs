use crate::error::{AnalyticsError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.day0() as u64)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date) + Months::new(1) - Days::new(1)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    month_end(date).day()
}

/// Shifts a date by whole calendar months, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    if months >= 0 {
        date + Months::new(months as u32)
    } else {
        date - Months::new(months.unsigned_abs())
    }
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Month starts for the `months` calendar months ending with the month of `as_of`, oldest first.
pub fn trailing_month_starts(as_of: NaiveDate, months: u32) -> Vec<NaiveDate> {
    let current = month_start(as_of);
    (0..months as i32)
        .rev()
        .map(|back| add_months(current, -back))
        .collect()
}

/// Parses a period string in the format "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// Returns (start_date, end_date)
pub fn parse_period_string(period: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = period.split(':').collect();

    match parts.len() {
        1 => {
            let start_date = parse_month(parts[0], "period")?;
            Ok((start_date, month_end(start_date)))
        }
        2 => {
            let start_date = parse_month(parts[0], "start date")?;
            let end_date = month_end(parse_month(parts[1], "end date")?);
            if end_date < start_date {
                return Err(AnalyticsError::InvalidDateRange {
                    start: start_date,
                    end: end_date,
                });
            }
            Ok((start_date, end_date))
        }
        _ => Err(AnalyticsError::InvalidPeriod(format!(
            "{}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

fn parse_month(part: &str, what: &str) -> Result<NaiveDate> {
    let date_str = format!("{}-01", part.trim());
    NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::DateError(format!(
            "Invalid {} format in period: {}. Expected YYYY-MM",
            what, part
        ))
    })
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Division that yields 0 for a zero denominator or a non-finite result.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    safe_div(std_dev(values), mean(values))
}

pub fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(month_start(date(2024, 2, 17)), date(2024, 2, 1));
        assert_eq!(month_end(date(2024, 2, 17)), date(2024, 2, 29));
        assert_eq!(month_end(date(2023, 2, 1)), date(2023, 2, 28));
        assert_eq!(month_end(date(2023, 12, 5)), date(2023, 12, 31));
        assert_eq!(days_in_month(date(2023, 4, 30)), 30);
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(add_months(date(2024, 3, 15), -3), date(2023, 12, 15));
        assert_eq!(add_months(date(2024, 3, 15), 0), date(2024, 3, 15));
    }

    #[test]
    fn test_trailing_month_starts() {
        let months = trailing_month_starts(date(2024, 2, 10), 3);
        assert_eq!(
            months,
            vec![date(2023, 12, 1), date(2024, 1, 1), date(2024, 2, 1)]
        );
        assert!(trailing_month_starts(date(2024, 2, 10), 0).is_empty());
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2023, 11, 1), date(2024, 2, 1)), 3);
        assert_eq!(months_between(date(2024, 2, 1), date(2024, 2, 28)), 0);
    }

    #[test]
    fn test_parse_period_string_month_and_range() {
        let (start, end) = parse_period_string("2023-02").unwrap();
        assert_eq!(start, date(2023, 2, 1));
        assert_eq!(end, date(2023, 2, 28));

        let (start, end) = parse_period_string("2023-01:2023-03").unwrap();
        assert_eq!(start, date(2023, 1, 1));
        assert_eq!(end, date(2023, 3, 31));
    }

    #[test]
    fn test_parse_period_string_rejects_garbage() {
        assert!(parse_period_string("2023-13").is_err());
        assert!(parse_period_string("2023-01:2023-02:2023-03").is_err());
        assert!(parse_period_string("2023-05:2023-01").is_err());
    }

    #[test]
    fn test_numeric_guards() {
        assert_eq!(safe_div(10.0, 0.0), 0.0);
        assert_eq!(safe_div(f64::INFINITY, 2.0), 0.0);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        assert_eq!(coefficient_of_variation(&[30.0, 30.0]), 0.0);
    }
}
