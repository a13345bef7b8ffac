use crate::aggregator::{aggregate_sales, CategoryTotal, PeriodSummary};
use crate::forecast::CashFlowProjection;
use crate::goals::{BudgetHealth, BudgetStatus};
use crate::policy::{AnomalyPolicy, RiskPolicy};
use crate::schema::{DateRange, Sale};
use crate::trend::growth_rate;
use crate::utils::{mean, safe_div};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesPeriodStats {
    pub revenue: f64,
    pub count: usize,
    pub average_ticket: f64,
    pub days: i64,
}

impl SalesPeriodStats {
    pub fn from_sales(sales: &[Sale], range: &DateRange) -> Self {
        let summary = aggregate_sales(sales, range);
        Self {
            revenue: summary.revenue,
            count: summary.count,
            average_ticket: summary.average_ticket,
            days: range.days(),
        }
    }

    pub fn daily_revenue(&self) -> f64 {
        safe_div(self.revenue, self.days as f64)
    }

    pub fn daily_count(&self) -> f64 {
        safe_div(self.count as f64, self.days as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    RevenueDrop,
    RevenueSpike,
    SalesDrop,
    SalesSpike,
    TicketLow,
    TicketHigh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesAnomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub current_value: f64,
    pub baseline_value: f64,
    pub deviation_pct: f64,
    pub message: String,
}

/// Compares current daily rates (and ticket size) against the baseline period.
pub fn detect_sales_anomalies(
    current: &SalesPeriodStats,
    baseline: &SalesPeriodStats,
    policy: &AnomalyPolicy,
) -> Vec<SalesAnomaly> {
    let mut anomalies = Vec::new();

    let checks = [
        (
            current.daily_revenue(),
            baseline.daily_revenue(),
            AnomalyKind::RevenueDrop,
            AnomalyKind::RevenueSpike,
            "daily revenue",
        ),
        (
            current.daily_count(),
            baseline.daily_count(),
            AnomalyKind::SalesDrop,
            AnomalyKind::SalesSpike,
            "daily sales",
        ),
    ];
    for (now, base, drop, spike, label) in checks {
        if let Some(anomaly) = compare_rate(now, base, drop, spike, label, policy) {
            anomalies.push(anomaly);
        }
    }

    if current.count > 0 {
        if let Some(anomaly) = compare_rate(
            current.average_ticket,
            baseline.average_ticket,
            AnomalyKind::TicketLow,
            AnomalyKind::TicketHigh,
            "average ticket",
            policy,
        ) {
            anomalies.push(anomaly);
        }
    }

    anomalies
}

fn compare_rate(
    current: f64,
    baseline: f64,
    drop: AnomalyKind,
    spike: AnomalyKind,
    label: &str,
    policy: &AnomalyPolicy,
) -> Option<SalesAnomaly> {
    if baseline <= 0.0 {
        return None;
    }
    let deviation_pct = growth_rate(current, baseline);
    if deviation_pct.abs() <= policy.threshold_pct {
        return None;
    }

    let severity = if deviation_pct.abs() >= policy.high_severity_pct {
        Severity::High
    } else {
        Severity::Medium
    };
    let (kind, direction) = if deviation_pct < 0.0 {
        (drop, "below")
    } else {
        (spike, "above")
    };

    Some(SalesAnomaly {
        kind,
        severity,
        current_value: current,
        baseline_value: baseline,
        deviation_pct,
        message: format!(
            "Current {} is {:.0}% {} the {}-day baseline ({:.2} vs {:.2})",
            label,
            deviation_pct.abs(),
            direction,
            policy.baseline_days,
            current,
            baseline
        ),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveClient {
    pub client_key: String,
    pub client_name: String,
    pub last_purchase: NaiveDate,
    pub average_gap_days: f64,
    pub days_since_last: i64,
    pub days_overdue: f64,
}

/// Clients whose usual purchase rhythm (times the inactivity multiplier) has elapsed
/// without a purchase in the current range.
pub fn detect_inactive_clients(
    sales: &[Sale],
    current_range: &DateRange,
    policy: &AnomalyPolicy,
) -> Vec<InactiveClient> {
    let mut history: BTreeMap<String, Vec<&Sale>> = BTreeMap::new();
    for sale in sales.iter().filter(|s| s.is_paid()) {
        history.entry(sale.client_key()).or_default().push(sale);
    }

    let mut inactive: Vec<InactiveClient> = history
        .into_iter()
        .filter_map(|(key, mut purchases)| {
            if purchases.iter().any(|s| current_range.contains(s.sale_date)) {
                return None;
            }
            purchases.retain(|s| s.sale_date < current_range.start);
            purchases.sort_by_key(|s| s.sale_date);
            if purchases.len() < 2 {
                return None;
            }

            let gaps: Vec<f64> = purchases
                .windows(2)
                .map(|pair| (pair[1].sale_date - pair[0].sale_date).num_days() as f64)
                .collect();
            let average_gap_days = mean(&gaps);
            let last = purchases[purchases.len() - 1];
            let days_since_last = (current_range.end - last.sale_date).num_days();
            let allowed = average_gap_days * policy.inactivity_multiplier;
            if (days_since_last as f64) <= allowed {
                return None;
            }

            Some(InactiveClient {
                client_key: key,
                client_name: last.client_name.clone(),
                last_purchase: last.sale_date,
                average_gap_days,
                days_since_last,
                days_overdue: days_since_last as f64 - allowed,
            })
        })
        .collect();

    inactive.sort_by(|a, b| {
        b.days_overdue
            .total_cmp(&a.days_overdue)
            .then_with(|| a.client_key.cmp(&b.client_key))
    });
    inactive
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRiskReport {
    pub current: SalesPeriodStats,
    pub baseline: SalesPeriodStats,
    pub anomalies: Vec<SalesAnomaly>,
    pub inactive_clients: Vec<InactiveClient>,
}

/// Baseline is the `baseline_days` immediately before the current range.
pub fn analyze_sales_risk(
    sales: &[Sale],
    current_range: &DateRange,
    policy: &AnomalyPolicy,
) -> SalesRiskReport {
    let baseline_end = current_range.start - Days::new(1);
    let baseline_range = DateRange {
        start: baseline_end - Days::new(policy.baseline_days.max(1) as u64 - 1),
        end: baseline_end,
    };

    let current = SalesPeriodStats::from_sales(sales, current_range);
    let baseline = SalesPeriodStats::from_sales(sales, &baseline_range);

    SalesRiskReport {
        anomalies: detect_sales_anomalies(&current, &baseline, policy),
        inactive_clients: detect_inactive_clients(sales, current_range, policy),
        current,
        baseline,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinancialRiskKind {
    NegativeCashFlow,
    IncomeDecline,
    ExpensesOutpacingIncome,
    BudgetExceeded,
    LowCashRunway,
    ExpenseConcentration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRisk {
    pub kind: FinancialRiskKind,
    pub severity: Severity,
    pub message: String,
    /// The figure that tripped the rule (amount, percentage or months).
    pub value: f64,
}

/// Threshold rules over the month's aggregates, budgets and cash projection.
pub fn detect_financial_risks(
    current: &PeriodSummary,
    previous: &PeriodSummary,
    budgets: &[BudgetStatus],
    cash_flow: &CashFlowProjection,
    categories: &[CategoryTotal],
    policy: &RiskPolicy,
) -> Vec<FinancialRisk> {
    let mut risks = Vec::new();

    if current.profit < 0.0 {
        risks.push(FinancialRisk {
            kind: FinancialRiskKind::NegativeCashFlow,
            severity: Severity::High,
            message: format!("Expenses exceed income by {:.2} this period", -current.profit),
            value: current.profit,
        });
    }

    let income_growth = growth_rate(current.income, previous.income);
    let expense_growth = growth_rate(current.expenses, previous.expenses);

    if previous.income > 0.0 && income_growth <= policy.income_decline_pct {
        risks.push(FinancialRisk {
            kind: FinancialRiskKind::IncomeDecline,
            severity: if income_growth <= policy.income_decline_pct * 2.0 {
                Severity::High
            } else {
                Severity::Medium
            },
            message: format!("Income fell {:.1}% versus the previous period", -income_growth),
            value: income_growth,
        });
    }

    if expense_growth > 0.0 && expense_growth > income_growth + policy.expense_outpace_pp {
        risks.push(FinancialRisk {
            kind: FinancialRiskKind::ExpensesOutpacingIncome,
            severity: Severity::Medium,
            message: format!(
                "Expenses grew {:.1}% while income changed {:.1}%",
                expense_growth, income_growth
            ),
            value: expense_growth - income_growth,
        });
    }

    for budget in budgets.iter().filter(|b| b.status == BudgetHealth::Exceeded) {
        risks.push(FinancialRisk {
            kind: FinancialRiskKind::BudgetExceeded,
            severity: Severity::Medium,
            message: format!(
                "Budget for {} is at {:.0}% ({:.2} of {:.2})",
                budget.category, budget.utilization_pct, budget.spent, budget.limit
            ),
            value: budget.utilization_pct,
        });
    }

    if let Some(runway) = cash_flow.runway_months {
        if runway < policy.runway_months {
            risks.push(FinancialRisk {
                kind: FinancialRiskKind::LowCashRunway,
                severity: Severity::High,
                message: format!("Cash covers about {:.1} months at the projected burn", runway),
                value: runway,
            });
        }
    }

    if let Some(top) = categories.first() {
        if categories.len() > 1 && top.share_pct > policy.category_concentration_pct {
            risks.push(FinancialRisk {
                kind: FinancialRiskKind::ExpenseConcentration,
                severity: Severity::Low,
                message: format!(
                    "{} accounts for {:.0}% of expenses",
                    top.category, top.share_pct
                ),
                value: top.share_pct,
            });
        }
    }

    risks
}
