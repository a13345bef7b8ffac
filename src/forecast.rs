use crate::policy::ForecastPolicy;
use crate::schema::{DateRange, FixedExpense};
use crate::trend::trend_factor;
use crate::utils::{finite_or_zero, mean, safe_div};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mean of the last `min(window, n)` values.
pub fn moving_average(values: &[f64], window: usize) -> f64 {
    let take = window.min(values.len());
    let tail: Vec<f64> = values[values.len() - take..]
        .iter()
        .copied()
        .map(finite_or_zero)
        .collect();
    mean(&tail)
}

/// Trend factor of the history, clamped to the policy's bound.
pub fn clamped_trend(history: &[f64], policy: &ForecastPolicy) -> f64 {
    let bound = policy.trend_clamp_pct.abs();
    trend_factor(history).clamp(-bound, bound)
}

/// Next-period value: trailing average scaled by the regression trend, floored at 0.
pub fn predict_monthly_revenue(history: &[f64], policy: &ForecastPolicy) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let base = moving_average(history, policy.window);
    let trend = clamped_trend(history, policy);
    (base * (1.0 + trend / 100.0)).max(0.0)
}

/// Trend-adjusted variable spending plus the monthly cost of every active fixed expense.
pub fn predict_monthly_expenses(
    variable_history: &[f64],
    fixed_expenses: &[FixedExpense],
    policy: &ForecastPolicy,
) -> f64 {
    let variable = predict_monthly_revenue(variable_history, policy);
    let fixed: f64 = fixed_expenses
        .iter()
        .filter(|f| f.active)
        .map(|f| finite_or_zero(f.monthly_equivalent()))
        .sum();
    variable + fixed
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub predicted_income: f64,
    pub predicted_expenses: f64,
    pub net: f64,
    pub projected_cash: f64,
    /// Months the current cash lasts at the projected burn. Only set while burning cash.
    pub runway_months: Option<f64>,
}

pub fn project_cash_flow(
    predicted_income: f64,
    predicted_expenses: f64,
    current_cash: f64,
) -> CashFlowProjection {
    let predicted_income = finite_or_zero(predicted_income);
    let predicted_expenses = finite_or_zero(predicted_expenses);
    let current_cash = finite_or_zero(current_cash);
    let net = predicted_income - predicted_expenses;

    let runway_months = if net < 0.0 && current_cash > 0.0 {
        Some(safe_div(current_cash, -net))
    } else {
        None
    };

    CashFlowProjection {
        predicted_income,
        predicted_expenses,
        net,
        projected_cash: net + current_cash,
        runway_months,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBands {
    pub conservative: f64,
    pub base: f64,
    pub optimistic: f64,
}

/// Fixed-multiplier bands around a base value. Not a confidence interval.
pub fn scenario_bands(base: f64, policy: &ForecastPolicy) -> ScenarioBands {
    let base = finite_or_zero(base);
    ScenarioBands {
        conservative: base * policy.conservative_multiplier,
        base,
        optimistic: base * policy.optimistic_multiplier,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesForecast {
    pub next_month: ScenarioBands,
    pub trend_pct: f64,
    /// Heuristic confidence in percent, driven only by how much history there is.
    pub confidence: u8,
}

pub fn forecast_sales(monthly_revenue: &[f64], policy: &ForecastPolicy) -> SalesForecast {
    let base = predict_monthly_revenue(monthly_revenue, policy);
    let confidence = match monthly_revenue.len() {
        0..=2 => 60,
        3..=5 => 75,
        _ => 85,
    };
    SalesForecast {
        next_month: scenario_bands(base, policy),
        trend_pct: clamped_trend(monthly_revenue, policy),
        confidence,
    }
}

/// Rolling predictions for the next `months` periods; each one joins the history
/// before the following is computed.
pub fn project_months(history: &[f64], months: usize, policy: &ForecastPolicy) -> Vec<f64> {
    let mut series = history.to_vec();
    let mut projected = Vec::with_capacity(months);
    for _ in 0..months {
        let next = predict_monthly_revenue(&series, policy);
        series.push(next);
        projected.push(next);
    }
    projected
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub name: String,
    pub amount: f64,
    pub due: NaiveDate,
}

/// Payments of active fixed expenses due inside the range, by date and then name.
pub fn scheduled_payments(
    fixed_expenses: &[FixedExpense],
    range: &DateRange,
) -> Vec<ScheduledPayment> {
    let mut payments: Vec<ScheduledPayment> = fixed_expenses
        .iter()
        .filter(|f| f.active)
        .flat_map(|f| {
            f.payments_between(range)
                .into_iter()
                .map(move |due| ScheduledPayment {
                    name: f.name.clone(),
                    amount: finite_or_zero(f.amount).abs(),
                    due,
                })
        })
        .collect();
    payments.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.name.cmp(&b.name)));
    payments
}
