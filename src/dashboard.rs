//! One-call composition of every analytics module for a business as of a given day.

use crate::aggregator::{
    aggregate_period, expenses_by_category, monthly_sales_revenue, monthly_totals,
    CategoryTotal, MonthlyTotals,
};
use crate::error::Result;
use crate::forecast::{
    forecast_sales, predict_monthly_expenses, predict_monthly_revenue, project_cash_flow,
    scenario_bands, scheduled_payments, CashFlowProjection, SalesForecast, ScenarioBands,
    ScheduledPayment,
};
use crate::goals::{
    analyze_monthly_goal_on, budget_status, goal_progress, BudgetStatus, GoalProgress,
    MonthlyGoalAnalysis,
};
use crate::insights::{build_financial_insights, build_sales_insights, prioritize, Insight};
use crate::policy::AnalyticsPolicy;
use crate::recurring::{
    detect_recurring_expenses, unregistered_recurring, DetectedRecurringExpense,
};
use crate::risk::{analyze_sales_risk, detect_financial_risks, FinancialRisk, SalesRiskReport};
use crate::sales::{analyze_sales, SalesMetrics};
use crate::schema::{Budget, DateRange, FinancialGoal, FixedExpense, GoalStatus, Sale, Transaction};
use crate::trend::{compare_periods, year_over_year, PeriodComparison};
use crate::utils::{add_months, mean, month_end, month_start, normalize_key};
use chrono::NaiveDate;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DashboardInput {
    #[schemars(description = "Day the dashboard is computed for, in YYYY-MM-DD format")]
    pub as_of: NaiveDate,

    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub fixed_expenses: Vec<FixedExpense>,

    #[serde(default)]
    pub budgets: Vec<Budget>,

    #[serde(default)]
    pub goals: Vec<FinancialGoal>,

    #[serde(default)]
    pub sales: Vec<Sale>,

    #[schemars(description = "Cash available today, used for runway and projected balance")]
    #[serde(default)]
    pub current_cash: f64,

    #[schemars(description = "Revenue target for the calendar month of as_of, if any")]
    #[serde(default)]
    pub monthly_revenue_target: Option<f64>,
}

impl DashboardInput {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardInput)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub as_of: NaiveDate,
    /// Month-to-date range ending at `as_of`.
    pub period: DateRange,
    /// The same days of the previous month.
    pub previous_period: DateRange,
    pub comparison: PeriodComparison,
    pub year_over_year: PeriodComparison,
    /// Closed months before the current one, oldest first.
    pub monthly_history: Vec<MonthlyTotals>,
    pub expense_categories: Vec<CategoryTotal>,
    pub recurring_expenses: Vec<DetectedRecurringExpense>,
    pub unregistered_recurring: Vec<DetectedRecurringExpense>,
    pub revenue_forecast: ScenarioBands,
    pub expense_forecast: f64,
    pub cash_flow: CashFlowProjection,
    /// Fixed-expense payments due from `as_of` through the end of the month.
    pub upcoming_payments: Vec<ScheduledPayment>,
    pub budgets: Vec<BudgetStatus>,
    pub goals: Vec<GoalProgress>,
    pub monthly_goal: Option<MonthlyGoalAnalysis>,
    pub sales: SalesMetrics,
    pub sales_forecast: SalesForecast,
    pub sales_risk: SalesRiskReport,
    pub financial_risks: Vec<FinancialRisk>,
    pub insights: Vec<Insight>,
}

pub struct DashboardAnalyzer {
    policy: AnalyticsPolicy,
}

impl DashboardAnalyzer {
    pub fn new(policy: AnalyticsPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &AnalyticsPolicy {
        &self.policy
    }

    pub fn analyze(&self, input: &DashboardInput) -> Result<DashboardReport> {
        let policy = &self.policy;
        let as_of = input.as_of;

        info!("Analyzing dashboard as of {}", as_of);
        debug!(
            "Input has {} transactions, {} sales, {} fixed expenses, {} budgets and {} goals",
            input.transactions.len(),
            input.sales.len(),
            input.fixed_expenses.len(),
            input.budgets.len(),
            input.goals.len()
        );

        let period = DateRange::month_to_date(as_of);
        let previous_period =
            DateRange::new(add_months(period.start, -1), add_months(as_of, -1))?;

        let current = aggregate_period(&input.transactions, &period);
        let previous = aggregate_period(&input.transactions, &previous_period);
        let comparison = compare_periods(&current, &previous);
        let yoy = year_over_year(&input.transactions, &period);

        let last_closed_month = add_months(month_start(as_of), -1);
        let history_months = policy.forecast.history_months;
        let monthly_history =
            monthly_totals(&input.transactions, last_closed_month, history_months);
        let variable_history = variable_expense_history(input, last_closed_month, history_months);
        let income_history: Vec<f64> = monthly_history.iter().map(|m| m.income).collect();

        let revenue_base = predict_monthly_revenue(&income_history, &policy.forecast);
        let expense_forecast =
            predict_monthly_expenses(&variable_history, &input.fixed_expenses, &policy.forecast);
        let cash_flow = project_cash_flow(revenue_base, expense_forecast, input.current_cash);
        debug!(
            "Forecast income {:.2}, expenses {:.2}, net {:.2}",
            revenue_base, expense_forecast, cash_flow.net
        );

        let rest_of_month = DateRange::new(as_of, month_end(as_of))?;
        let upcoming_payments = scheduled_payments(&input.fixed_expenses, &rest_of_month);

        let expense_categories = expenses_by_category(&input.transactions, &period);
        let recurring_expenses =
            detect_recurring_expenses(&input.transactions, &policy.recurring);
        let unregistered = unregistered_recurring(&recurring_expenses, &input.fixed_expenses);

        let budgets: Vec<BudgetStatus> = input
            .budgets
            .iter()
            .map(|b| budget_status(b, &input.transactions, as_of, &policy.budget))
            .collect();

        let profits: Vec<f64> = monthly_history.iter().map(|m| m.profit).collect();
        let capacity = (!profits.is_empty()).then(|| mean(&profits));
        let goals: Vec<GoalProgress> = input
            .goals
            .iter()
            .filter(|g| g.status != GoalStatus::Cancelled)
            .map(|g| goal_progress(g, as_of, capacity))
            .collect();

        let sales = analyze_sales(&input.sales, &period, TOP_N);
        let sales_history = monthly_sales_revenue(&input.sales, last_closed_month, history_months);
        let sales_forecast = forecast_sales(&sales_history, &policy.forecast);
        let sales_risk = analyze_sales_risk(&input.sales, &period, &policy.anomaly);

        let monthly_goal = input.monthly_revenue_target.map(|target| {
            let achieved = if input.sales.is_empty() {
                current.income
            } else {
                sales.current.revenue
            };
            analyze_monthly_goal_on(as_of, achieved, target, &policy.goal)
        });

        let financial_risks = detect_financial_risks(
            &current,
            &previous,
            &budgets,
            &cash_flow,
            &expense_categories,
            &policy.risk,
        );

        let mut insights =
            build_sales_insights(&sales, &sales_risk, Some(&sales_forecast), &policy.insight);
        insights.extend(build_financial_insights(
            &financial_risks,
            &unregistered,
            &comparison,
            &cash_flow,
            &policy.insight,
        ));
        let insights = prioritize(insights, policy.insight.max_insights);

        info!(
            "Dashboard ready: {} risks, {} insights, {} recurring expenses ({} unregistered)",
            financial_risks.len(),
            insights.len(),
            recurring_expenses.len(),
            unregistered.len()
        );

        Ok(DashboardReport {
            as_of,
            period,
            previous_period,
            comparison,
            year_over_year: yoy,
            monthly_history,
            expense_categories,
            recurring_expenses,
            unregistered_recurring: unregistered,
            revenue_forecast: scenario_bands(revenue_base, &policy.forecast),
            expense_forecast,
            cash_flow,
            upcoming_payments,
            budgets,
            goals,
            monthly_goal,
            sales,
            sales_forecast,
            sales_risk,
            financial_risks,
            insights,
        })
    }
}

/// Monthly expenses excluding payments to active fixed expenses, which the expense
/// forecast adds back at their scheduled cost.
fn variable_expense_history(
    input: &DashboardInput,
    last_month: NaiveDate,
    months: u32,
) -> Vec<f64> {
    let fixed: BTreeSet<String> = input
        .fixed_expenses
        .iter()
        .filter(|f| f.active)
        .map(|f| normalize_key(&f.name))
        .collect();
    let variable: Vec<Transaction> = input
        .transactions
        .iter()
        .filter(|t| !(t.is_expense() && fixed.contains(&normalize_key(&t.concept))))
        .cloned()
        .collect();
    monthly_totals(&variable, last_month, months)
        .into_iter()
        .map(|m| m.expenses)
        .collect()
}

pub fn analyze_dashboard(input: &DashboardInput) -> Result<DashboardReport> {
    DashboardAnalyzer::new(AnalyticsPolicy::default())?.analyze(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use crate::schema::{
        BudgetPeriod, Frequency, GoalPriority, PaymentMethod, SaleStatus, TransactionOrigin,
        TransactionStatus, TransactionType,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(
        kind: TransactionType,
        amount: f64,
        on: NaiveDate,
        concept: &str,
        category: &str,
    ) -> Transaction {
        Transaction {
            kind,
            amount,
            date: on,
            concept: concept.to_string(),
            category: category.to_string(),
            client_id: None,
            payment_method: PaymentMethod::Transfer,
            status: TransactionStatus::Completed,
            origin: TransactionOrigin::Manual,
        }
    }

    /// Six closed months (Oct 2023 - Mar 2024) of flat activity.
    fn small_business() -> DashboardInput {
        use TransactionType::{Expense, Income};

        let mut transactions = Vec::new();
        for offset in 0..6 {
            let month = add_months(date(2023, 10, 1), offset);
            transactions.push(tx(Income, 5000.0, month + Days::new(4), "Retainer", "Services"));
            transactions.push(tx(Expense, 1500.0, month, "Office rent", "Rent"));
            transactions.push(tx(Expense, 500.0, month + Days::new(11), "Supplies", "Operations"));
        }
        DashboardInput {
            as_of: date(2024, 4, 15),
            transactions,
            fixed_expenses: vec![FixedExpense {
                name: "Office rent".to_string(),
                amount: 1500.0,
                frequency: Frequency::Monthly,
                next_payment: date(2024, 5, 1),
                active: true,
            }],
            budgets: vec![Budget {
                category: "Operations".to_string(),
                limit: 600.0,
                period: BudgetPeriod::Monthly,
            }],
            goals: vec![FinancialGoal {
                title: "Emergency fund".to_string(),
                target: 10_000.0,
                current: 4000.0,
                deadline: date(2024, 12, 31),
                priority: GoalPriority::High,
                status: GoalStatus::Active,
            }],
            sales: vec![Sale {
                client_id: None,
                client_name: "Acme".to_string(),
                product: "Consulting".to_string(),
                category: Some("Services".to_string()),
                total: 800.0,
                status: SaleStatus::Paid,
                sale_date: date(2024, 4, 3),
            }],
            current_cash: 12_000.0,
            monthly_revenue_target: Some(2000.0),
        }
    }

    #[test]
    fn test_dashboard_composes_modules() {
        let report = analyze_dashboard(&small_business()).unwrap();

        assert_eq!(report.period, DateRange::month_to_date(date(2024, 4, 15)));
        assert_eq!(report.previous_period.start, date(2024, 3, 1));
        assert_eq!(report.previous_period.end, date(2024, 3, 15));
        assert_eq!(report.comparison.previous.income, 5000.0);
        assert_eq!(report.comparison.current.income, 0.0);

        assert_eq!(report.monthly_history.len(), 6);
        assert_eq!(report.monthly_history[5].month, date(2024, 3, 1));

        // Flat income and a 500 variable spend plus 1500 of rent.
        assert!((report.revenue_forecast.base - 5000.0).abs() < 1e-6);
        assert!((report.expense_forecast - 2000.0).abs() < 1e-6);
        assert!((report.cash_flow.net - 3000.0).abs() < 1e-6);

        assert_eq!(report.recurring_expenses.len(), 2);
        assert_eq!(report.unregistered_recurring.len(), 1);
        assert_eq!(report.unregistered_recurring[0].supplier, "Supplies");

        assert_eq!(report.budgets[0].spent, 0.0);
        assert_eq!(report.goals.len(), 1);

        let monthly_goal = report.monthly_goal.unwrap();
        assert_eq!(monthly_goal.current, 800.0);
        assert_eq!(monthly_goal.days_in_month, 30);

        assert!(report.insights.len() <= 5);
    }

    #[test]
    fn test_upcoming_payments_cover_rest_of_month() {
        let mut input = small_business();
        assert!(analyze_dashboard(&input).unwrap().upcoming_payments.is_empty());

        input.fixed_expenses[0].next_payment = date(2024, 1, 31);
        let report = analyze_dashboard(&input).unwrap();
        assert_eq!(report.upcoming_payments.len(), 1);
        assert_eq!(report.upcoming_payments[0].name, "Office rent");
        assert_eq!(report.upcoming_payments[0].due, date(2024, 4, 30));
        assert_eq!(report.upcoming_payments[0].amount, 1500.0);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut policy = AnalyticsPolicy::default();
        policy.forecast.window = 0;
        assert!(DashboardAnalyzer::new(policy).is_err());
    }

    #[test]
    fn test_non_finite_cash_counts_as_zero() {
        let mut input = small_business();
        input.current_cash = f64::NAN;
        let report = analyze_dashboard(&input).unwrap();
        let cf = &report.cash_flow;
        assert!(cf.net.is_finite());
        assert_eq!(cf.projected_cash, cf.net);
        assert_eq!(cf.runway_months, None);
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = DashboardInput::schema_as_json().unwrap();
        assert!(schema_json.contains("as_of"));
        assert!(schema_json.contains("transactions"));
        assert!(schema_json.contains("monthly_revenue_target"));
    }
}
