use crate::policy::{BudgetPolicy, GoalPolicy};
use crate::schema::{Budget, FinancialGoal, Transaction};
use crate::utils::{days_in_month, finite_or_zero, normalize_key, safe_div};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskStatus {
    Success,
    Warning,
    Risk,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyGoalAnalysis {
    pub current: f64,
    pub target: f64,
    /// Fraction of the target reached, capped at 1.
    pub progress: f64,
    /// Month-end value if the pace so far holds.
    pub projection: f64,
    pub risk_status: RiskStatus,
    pub remaining: f64,
    pub days_passed: u32,
    pub days_in_month: u32,
    /// Amount needed per remaining day to hit the target.
    pub daily_required_pace: f64,
}

pub fn analyze_monthly_goal(
    current: f64,
    target: f64,
    days_passed: u32,
    days_in_month: u32,
    policy: &GoalPolicy,
) -> MonthlyGoalAnalysis {
    let current = finite_or_zero(current);
    let target = finite_or_zero(target);
    let days_in_month = days_in_month.max(1);
    let days_passed = days_passed.clamp(1, days_in_month);

    let progress = safe_div(current, target).min(1.0);
    let projection = safe_div(current, days_passed as f64) * days_in_month as f64;

    let risk_status = if projection >= target {
        RiskStatus::Success
    } else if projection >= target * policy.warning_ratio {
        RiskStatus::Warning
    } else {
        RiskStatus::Risk
    };

    let remaining = (target - current).max(0.0);
    let days_left = days_in_month - days_passed;
    let daily_required_pace = if remaining > 0.0 && days_left > 0 {
        remaining / days_left as f64
    } else {
        0.0
    };

    MonthlyGoalAnalysis {
        current,
        target,
        progress,
        projection,
        risk_status,
        remaining,
        days_passed,
        days_in_month,
        daily_required_pace,
    }
}

/// Same as [`analyze_monthly_goal`], with the day counts taken from the calendar.
pub fn analyze_monthly_goal_on(
    as_of: NaiveDate,
    current: f64,
    target: f64,
    policy: &GoalPolicy,
) -> MonthlyGoalAnalysis {
    analyze_monthly_goal(current, target, as_of.day(), days_in_month(as_of), policy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetHealth {
    Good,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    pub utilization_pct: f64,
    pub status: BudgetHealth,
}

/// Completed spending of the budget's category within its period around `as_of`.
pub fn budget_status(
    budget: &Budget,
    transactions: &[Transaction],
    as_of: NaiveDate,
    policy: &BudgetPolicy,
) -> BudgetStatus {
    let range = budget.period.range_containing(as_of);
    let category = normalize_key(&budget.category);
    let spent: f64 = transactions
        .iter()
        .filter(|t| {
            t.is_expense()
                && t.is_completed()
                && range.contains(t.date)
                && normalize_key(&t.category) == category
        })
        .map(|t| finite_or_zero(t.amount).abs())
        .sum();

    let limit = finite_or_zero(budget.limit);
    let (utilization_pct, status) = if limit <= 0.0 {
        let status = if spent > 0.0 {
            BudgetHealth::Exceeded
        } else {
            BudgetHealth::Good
        };
        (0.0, status)
    } else {
        let utilization = spent / limit * 100.0;
        let status = if utilization > policy.exceeded_pct {
            BudgetHealth::Exceeded
        } else if utilization > policy.warning_pct {
            BudgetHealth::Warning
        } else {
            BudgetHealth::Good
        };
        (utilization, status)
    };

    BudgetStatus {
        category: budget.category.clone(),
        limit,
        spent,
        remaining: (limit - spent).max(0.0),
        utilization_pct,
        status,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalHealth {
    Completed,
    OnTrack,
    AtRisk,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub title: String,
    pub percent: f64,
    pub remaining: f64,
    pub days_left: i64,
    pub months_left: u32,
    pub monthly_required: f64,
    pub health: GoalHealth,
}

/// Progress of a savings goal toward its deadline. `monthly_capacity` is what the
/// business can set aside per month (e.g. average profit); without it a goal is never
/// judged at risk.
pub fn goal_progress(
    goal: &FinancialGoal,
    as_of: NaiveDate,
    monthly_capacity: Option<f64>,
) -> GoalProgress {
    let target = finite_or_zero(goal.target);
    let current = finite_or_zero(goal.current);
    let percent = (safe_div(current, target) * 100.0).min(100.0);
    let remaining = (target - current).max(0.0);
    let days_left = (goal.deadline - as_of).num_days().max(0);
    let months_left = ((days_left as f64) / 30.0).ceil().max(1.0) as u32;
    let monthly_required = remaining / months_left as f64;

    let health = if remaining <= 0.0 {
        GoalHealth::Completed
    } else if goal.deadline < as_of {
        GoalHealth::Overdue
    } else {
        match monthly_capacity {
            Some(capacity) if monthly_required > finite_or_zero(capacity) => GoalHealth::AtRisk,
            _ => GoalHealth::OnTrack,
        }
    };

    GoalProgress {
        title: goal.title.clone(),
        percent,
        remaining,
        days_left,
        months_left,
        monthly_required,
        health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        BudgetPeriod, GoalPriority, GoalStatus, PaymentMethod, TransactionOrigin,
        TransactionStatus, TransactionType,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_goal_halfway_on_pace() {
        let analysis = analyze_monthly_goal(50.0, 100.0, 15, 30, &GoalPolicy::default());
        assert_eq!(analysis.progress, 0.5);
        assert_eq!(analysis.projection, 100.0);
        assert_eq!(analysis.risk_status, RiskStatus::Success);
        assert_eq!(analysis.remaining, 50.0);
        assert!((analysis.daily_required_pace - 50.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_monthly_goal_warning_and_risk() {
        let policy = GoalPolicy::default();
        // 42/15*30 = 84, within 80% of 100.
        let warning = analyze_monthly_goal(42.0, 100.0, 15, 30, &policy);
        assert_eq!(warning.risk_status, RiskStatus::Warning);
        let risk = analyze_monthly_goal(30.0, 100.0, 15, 30, &policy);
        assert_eq!(risk.risk_status, RiskStatus::Risk);
    }

    #[test]
    fn test_monthly_goal_edges() {
        let policy = GoalPolicy::default();
        let exceeded = analyze_monthly_goal(150.0, 100.0, 30, 30, &policy);
        assert_eq!(exceeded.progress, 1.0);
        assert_eq!(exceeded.daily_required_pace, 0.0);

        // Day zero is treated as the first day of the month.
        let first_day = analyze_monthly_goal(10.0, 100.0, 0, 30, &policy);
        assert_eq!(first_day.days_passed, 1);
        assert_eq!(first_day.projection, 300.0);

        let no_target = analyze_monthly_goal(10.0, 0.0, 10, 30, &policy);
        assert_eq!(no_target.progress, 0.0);
        assert_eq!(no_target.risk_status, RiskStatus::Success);
    }

    #[test]
    fn test_monthly_goal_from_calendar() {
        let analysis =
            analyze_monthly_goal_on(date(2024, 2, 10), 1000.0, 3000.0, &GoalPolicy::default());
        assert_eq!(analysis.days_passed, 10);
        assert_eq!(analysis.days_in_month, 29);
        assert!((analysis.projection - 2900.0).abs() < 1e-9);
        assert_eq!(analysis.risk_status, RiskStatus::Warning);
    }

    fn expense(category: &str, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            kind: TransactionType::Expense,
            amount,
            date: on,
            concept: "purchase".to_string(),
            category: category.to_string(),
            client_id: None,
            payment_method: PaymentMethod::Card,
            status: TransactionStatus::Completed,
            origin: TransactionOrigin::Manual,
        }
    }

    #[test]
    fn test_budget_status_thresholds() {
        let transactions = vec![
            expense("Marketing", 300.0, date(2024, 5, 2)),
            expense("marketing ", 550.0, date(2024, 5, 20)),
            expense("Marketing", 999.0, date(2024, 4, 30)),
            expense("Travel", 100.0, date(2024, 5, 3)),
        ];
        let policy = BudgetPolicy::default();
        let as_of = date(2024, 5, 25);

        let marketing = Budget {
            category: "Marketing".to_string(),
            limit: 1000.0,
            period: BudgetPeriod::Monthly,
        };
        let status = budget_status(&marketing, &transactions, as_of, &policy);
        assert_eq!(status.spent, 850.0);
        assert_eq!(status.status, BudgetHealth::Warning);
        assert_eq!(status.remaining, 150.0);

        let tight = Budget {
            limit: 800.0,
            ..marketing.clone()
        };
        assert_eq!(
            budget_status(&tight, &transactions, as_of, &policy).status,
            BudgetHealth::Exceeded
        );

        let travel = Budget {
            category: "Travel".to_string(),
            limit: 500.0,
            period: BudgetPeriod::Monthly,
        };
        let status = budget_status(&travel, &transactions, as_of, &policy);
        assert_eq!(status.utilization_pct, 20.0);
        assert_eq!(status.status, BudgetHealth::Good);

        let zero = Budget {
            limit: 0.0,
            ..travel
        };
        let status = budget_status(&zero, &transactions, as_of, &policy);
        assert_eq!(status.utilization_pct, 0.0);
        assert_eq!(status.status, BudgetHealth::Exceeded);
    }

    fn goal(current: f64, deadline: NaiveDate) -> FinancialGoal {
        FinancialGoal {
            title: "Emergency fund".to_string(),
            target: 12_000.0,
            current,
            deadline,
            priority: GoalPriority::High,
            status: GoalStatus::Active,
        }
    }

    #[test]
    fn test_goal_progress_health() {
        let as_of = date(2024, 1, 1);

        let on_track = goal_progress(&goal(6000.0, date(2024, 7, 1)), as_of, Some(1500.0));
        assert_eq!(on_track.percent, 50.0);
        assert_eq!(on_track.days_left, 182);
        assert_eq!(on_track.months_left, 7);
        assert!((on_track.monthly_required - 6000.0 / 7.0).abs() < 1e-9);
        assert_eq!(on_track.health, GoalHealth::OnTrack);

        let at_risk = goal_progress(&goal(6000.0, date(2024, 7, 1)), as_of, Some(500.0));
        assert_eq!(at_risk.health, GoalHealth::AtRisk);

        let overdue = goal_progress(&goal(6000.0, date(2023, 12, 1)), as_of, None);
        assert_eq!(overdue.health, GoalHealth::Overdue);
        assert_eq!(overdue.days_left, 0);
        assert_eq!(overdue.monthly_required, 6000.0);

        let done = goal_progress(&goal(13_000.0, date(2023, 12, 1)), as_of, None);
        assert_eq!(done.health, GoalHealth::Completed);
        assert_eq!(done.percent, 100.0);
    }
}
