use crate::aggregator::{aggregate_period, PeriodSummary};
use crate::schema::{DateRange, Transaction};
use crate::utils::{finite_or_zero, safe_div};
use serde::{Deserialize, Serialize};

/// Percentage change `(current - previous) / previous * 100`. A zero previous value
/// yields 0.
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    let current = finite_or_zero(current);
    let previous = finite_or_zero(previous);
    safe_div(current - previous, previous) * 100.0
}

/// Same as [`growth_rate`] but undefined (`None`) when there is no previous value.
/// Used by the sales metrics, where "new" should not read as "+0%".
pub fn growth_rate_opt(current: f64, previous: f64) -> Option<f64> {
    let previous = finite_or_zero(previous);
    if previous == 0.0 {
        return None;
    }
    Some(growth_rate(current, previous))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

/// Ordinary least squares over an indexed series (x = 0..n-1).
pub fn linear_regression(values: &[f64]) -> Regression {
    let values: Vec<f64> = values.iter().copied().map(finite_or_zero).collect();
    match values.len() {
        0 => {
            return Regression {
                slope: 0.0,
                intercept: 0.0,
            }
        }
        1 => {
            return Regression {
                slope: 0.0,
                intercept: values[0],
            }
        }
        _ => {}
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, &y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();

    let slope = safe_div(n * sum_xy - sum_x * sum_y, n * sum_x2 - sum_x.powi(2));
    let intercept = (sum_y - slope * sum_x) / n;

    Regression { slope, intercept }
}

/// Regression slope as a percentage of the intercept. 0 when the intercept is 0.
pub fn trend_factor(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let regression = linear_regression(values);
    safe_div(regression.slope, regression.intercept) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

impl TrendDirection {
    const DEAD_BAND_PCT: f64 = 5.0;

    pub fn from_growth(growth_pct: f64) -> Self {
        if growth_pct > Self::DEAD_BAND_PCT {
            Self::Rising
        } else if growth_pct < -Self::DEAD_BAND_PCT {
            Self::Falling
        } else {
            Self::Stable
        }
    }
}

/// Extrapolates the pace of `amount` over `days_elapsed` to `horizon_days`.
pub fn run_rate(amount: f64, days_elapsed: u32, horizon_days: u32) -> f64 {
    safe_div(finite_or_zero(amount), days_elapsed as f64) * horizon_days as f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub income_growth: f64,
    pub expense_growth: f64,
    pub profit_growth: f64,
    pub income_trend: TrendDirection,
}

pub fn compare_periods(current: &PeriodSummary, previous: &PeriodSummary) -> PeriodComparison {
    let income_growth = growth_rate(current.income, previous.income);
    PeriodComparison {
        current: current.clone(),
        previous: previous.clone(),
        income_growth,
        expense_growth: growth_rate(current.expenses, previous.expenses),
        profit_growth: growth_rate(current.profit, previous.profit),
        income_trend: TrendDirection::from_growth(income_growth),
    }
}

/// Compares a range against the same calendar span one year earlier.
pub fn year_over_year(transactions: &[Transaction], range: &DateRange) -> PeriodComparison {
    let current = aggregate_period(transactions, range);
    let previous = aggregate_period(transactions, &range.year_ago());
    compare_periods(&current, &previous)
}
