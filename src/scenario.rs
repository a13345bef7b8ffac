//! What-if simulation of monthly cash over a horizon.
//!
//! A scenario starts from a baseline monthly income and expense level, applies
//! percentage changes and new recurring items, books an optional one-time amount in the
//! first month, and walks the cash balance forward month by month.

use crate::utils::finite_or_zero;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScenarioInput {
    pub name: String,
    #[schemars(
        description = "Percentage change applied to baseline monthly income, e.g. -15 for a 15% drop"
    )]
    pub revenue_change_pct: f64,
    #[schemars(description = "Percentage change applied to baseline monthly expenses")]
    pub expense_change_pct: f64,
    pub new_monthly_income: f64,
    pub new_monthly_expense: f64,
    #[schemars(
        description = "Booked in the first month. Positive is an inflow, negative an outflow."
    )]
    pub one_time_amount: f64,
    pub months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMonth {
    /// 1-based month offset from today.
    pub index: u32,
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub months: Vec<ScenarioMonth>,
    pub ending_cash: f64,
    pub lowest_cash: f64,
    pub first_negative_month: Option<u32>,
    pub total_net: f64,
}

pub fn simulate(
    baseline_income: f64,
    baseline_expenses: f64,
    current_cash: f64,
    input: &ScenarioInput,
) -> ScenarioResult {
    let income = finite_or_zero(baseline_income)
        * (1.0 + finite_or_zero(input.revenue_change_pct) / 100.0)
        + finite_or_zero(input.new_monthly_income);
    let expenses = finite_or_zero(baseline_expenses)
        * (1.0 + finite_or_zero(input.expense_change_pct) / 100.0)
        + finite_or_zero(input.new_monthly_expense);
    let income = income.max(0.0);
    let expenses = expenses.max(0.0);

    let mut cash = finite_or_zero(current_cash);
    let mut lowest_cash = cash;
    let mut first_negative_month = None;
    let mut total_net = 0.0;
    let mut months = Vec::with_capacity(input.months as usize);

    for index in 1..=input.months {
        let mut net = income - expenses;
        if index == 1 {
            net += finite_or_zero(input.one_time_amount);
        }
        cash += net;
        total_net += net;
        lowest_cash = lowest_cash.min(cash);
        if cash < 0.0 && first_negative_month.is_none() {
            first_negative_month = Some(index);
        }
        months.push(ScenarioMonth {
            index,
            income,
            expenses,
            net,
            cash,
        });
    }

    ScenarioResult {
        name: input.name.clone(),
        months,
        ending_cash: cash,
        lowest_cash,
        first_negative_month,
        total_net,
    }
}

/// Runs every scenario against the same baseline, in input order.
pub fn compare_scenarios(
    baseline_income: f64,
    baseline_expenses: f64,
    current_cash: f64,
    inputs: &[ScenarioInput],
) -> Vec<ScenarioResult> {
    inputs
        .iter()
        .map(|input| simulate(baseline_income, baseline_expenses, current_cash, input))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_scenario_accumulates_net() {
        let input = ScenarioInput {
            name: "Status quo".to_string(),
            months: 3,
            ..Default::default()
        };
        let result = simulate(5000.0, 4000.0, 1000.0, &input);
        assert_eq!(result.months.len(), 3);
        assert_eq!(result.ending_cash, 4000.0);
        assert_eq!(result.total_net, 3000.0);
        assert_eq!(result.lowest_cash, 1000.0);
        assert!(result.first_negative_month.is_none());
    }

    #[test]
    fn test_downturn_goes_negative() {
        let input = ScenarioInput {
            name: "Lost client".to_string(),
            revenue_change_pct: -40.0,
            one_time_amount: -500.0,
            months: 6,
            ..Default::default()
        };
        // Income 3000 against 4000 of expenses: -1000/month, -1500 in month one.
        let result = simulate(5000.0, 4000.0, 2000.0, &input);
        assert_eq!(result.months[0].net, -1500.0);
        assert_eq!(result.months[0].cash, 500.0);
        assert_eq!(result.first_negative_month, Some(2));
        assert_eq!(result.ending_cash, -4500.0);
        assert_eq!(result.lowest_cash, -4500.0);
    }

    #[test]
    fn test_new_hire_scenario() {
        let input = ScenarioInput {
            name: "Hire".to_string(),
            expense_change_pct: 10.0,
            new_monthly_expense: 2500.0,
            new_monthly_income: 1000.0,
            months: 2,
            ..Default::default()
        };
        let result = simulate(10_000.0, 6000.0, 0.0, &input);
        assert_eq!(result.months[0].income, 11_000.0);
        assert!((result.months[0].expenses - 9100.0).abs() < 1e-9);
        assert!((result.ending_cash - 3800.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_months_keeps_cash() {
        let result = simulate(1.0, 2.0, 750.0, &ScenarioInput::default());
        assert!(result.months.is_empty());
        assert_eq!(result.ending_cash, 750.0);
        assert_eq!(result.total_net, 0.0);
    }

    #[test]
    fn test_compare_scenarios_preserves_order() {
        let inputs = vec![
            ScenarioInput {
                name: "A".to_string(),
                months: 1,
                ..Default::default()
            },
            ScenarioInput {
                name: "B".to_string(),
                months: 1,
                revenue_change_pct: 50.0,
                ..Default::default()
            },
        ];
        let results = compare_scenarios(1000.0, 800.0, 0.0, &inputs);
        assert_eq!(results[0].name, "A");
        assert_eq!(results[1].ending_cash, 700.0);
    }
}
