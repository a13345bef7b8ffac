//! Turns numeric results into ranked, human-readable recommendations.
//!
//! Each rule compares one figure against a fixed threshold from [`InsightPolicy`].
//! Confidence values are constants per insight kind, not derived from the data.

use crate::forecast::{CashFlowProjection, SalesForecast};
use crate::policy::InsightPolicy;
use crate::recurring::DetectedRecurringExpense;
use crate::risk::{FinancialRisk, FinancialRiskKind, SalesRiskReport, Severity};
use crate::sales::SalesMetrics;
use crate::trend::PeriodComparison;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightKind {
    UpsellOpportunity,
    CategoryDominanceRisk,
    ClientConcentrationRisk,
    RevenueDecline,
    SalesMomentum,
    ReactivateClients,
    SalesAnomaly,
    NegativeCashFlow,
    IncomeDecline,
    ExpensesOutpacingIncome,
    BudgetExceeded,
    LowCashRunway,
    ExpenseConcentration,
    RegisterRecurringExpenses,
    ReinvestProfit,
    CutExpenses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

impl From<Severity> for InsightPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => InsightPriority::Low,
            Severity::Medium => InsightPriority::Medium,
            Severity::High => InsightPriority::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub priority: InsightPriority,
    pub title: String,
    pub message: String,
    /// Heuristic confidence in percent (60-95).
    pub confidence: u8,
    /// Monetary effect per month, when one can be estimated.
    pub impact: Option<f64>,
}

impl Insight {
    fn new(
        kind: InsightKind,
        priority: InsightPriority,
        confidence: u8,
        title: &str,
        message: String,
    ) -> Self {
        Self {
            kind,
            priority,
            title: title.to_string(),
            message,
            confidence,
            impact: None,
        }
    }

    fn with_impact(mut self, impact: f64) -> Self {
        self.impact = Some(impact);
        self
    }
}

pub fn build_sales_insights(
    metrics: &SalesMetrics,
    risk: &SalesRiskReport,
    forecast: Option<&SalesForecast>,
    policy: &InsightPolicy,
) -> Vec<Insight> {
    use InsightKind::*;
    use InsightPriority::*;

    let mut insights = Vec::new();

    if let Some(growth) = metrics.revenue_growth {
        if growth < policy.revenue_decline_pct {
            insights.push(
                Insight::new(
                    RevenueDecline,
                    High,
                    90,
                    "Revenue is declining",
                    format!("Paid revenue is down {:.1}% versus the previous period", -growth),
                )
                .with_impact(metrics.current.revenue - metrics.previous.revenue),
            );
        } else if growth > policy.momentum_pct {
            let mut insight = Insight::new(
                SalesMomentum,
                Low,
                70,
                "Sales momentum",
                format!(
                    "Paid revenue is up {:.1}%; consider raising stock or capacity",
                    growth
                ),
            );
            if let Some(forecast) = forecast {
                insight = insight.with_impact(forecast.next_month.base - metrics.current.revenue);
            }
            insights.push(insight);
        }
    }

    if metrics.repeat_customer_rate > policy.repeat_customer_pct {
        insights.push(Insight::new(
            UpsellOpportunity,
            Medium,
            80,
            "Upsell to returning clients",
            format!(
                "{:.0}% of paying clients bought more than once; bundles or loyalty pricing can lift the average ticket",
                metrics.repeat_customer_rate
            ),
        ));
    }

    if let Some(category) = metrics.categories.first() {
        if metrics.top_category_share_pct > policy.category_dominance_pct {
            insights.push(Insight::new(
                CategoryDominanceRisk,
                Medium,
                75,
                "Revenue depends on one category",
                format!(
                    "{} brings {:.0}% of revenue",
                    category.name, metrics.top_category_share_pct
                ),
            ));
        }
    }

    if let Some(client) = metrics.top_clients.first() {
        if metrics.top_client_share_pct > policy.client_concentration_pct {
            insights.push(Insight::new(
                ClientConcentrationRisk,
                High,
                85,
                "Revenue depends on one client",
                format!(
                    "{} accounts for {:.0}% of revenue",
                    client.name, metrics.top_client_share_pct
                ),
            ));
        }
    }

    if !risk.inactive_clients.is_empty() {
        let names: Vec<&str> = risk
            .inactive_clients
            .iter()
            .take(3)
            .map(|c| c.client_name.as_str())
            .collect();
        insights.push(Insight::new(
            ReactivateClients,
            Medium,
            65,
            "Reach out to inactive clients",
            format!(
                "{} client(s) are past their usual purchase rhythm: {}",
                risk.inactive_clients.len(),
                names.join(", ")
            ),
        ));
    }

    for anomaly in risk.anomalies.iter().filter(|a| a.severity == Severity::High) {
        insights.push(Insight::new(
            SalesAnomaly,
            High,
            95,
            "Unusual sales activity",
            anomaly.message.clone(),
        ));
    }

    insights
}

pub fn build_financial_insights(
    risks: &[FinancialRisk],
    unregistered: &[DetectedRecurringExpense],
    comparison: &PeriodComparison,
    cash_flow: &CashFlowProjection,
    policy: &InsightPolicy,
) -> Vec<Insight> {
    use InsightPriority::*;

    let mut insights: Vec<Insight> = risks.iter().map(risk_insight).collect();

    if !unregistered.is_empty() {
        let monthly: f64 = unregistered.iter().map(|d| d.monthly_equivalent).sum();
        insights.push(
            Insight::new(
                InsightKind::RegisterRecurringExpenses,
                Low,
                70,
                "Register recurring payments",
                format!(
                    "{} recurring payment(s) are not tracked as fixed expenses",
                    unregistered.len()
                ),
            )
            .with_impact(-monthly),
        );
    }

    let current = &comparison.current;
    if current.margin_pct() > policy.reinvest_margin_pct && comparison.income_growth > 0.0 {
        insights.push(
            Insight::new(
                InsightKind::ReinvestProfit,
                Low,
                60,
                "Room to reinvest",
                format!(
                    "Margin is {:.0}% with income growing {:.1}%; projected monthly surplus is {:.2}",
                    current.margin_pct(),
                    comparison.income_growth,
                    cash_flow.net
                ),
            )
            .with_impact(cash_flow.net),
        );
    }

    if comparison.expense_growth > 0.0 && current.profit < 0.0 {
        insights.push(
            Insight::new(
                InsightKind::CutExpenses,
                High,
                85,
                "Trim expenses",
                format!(
                    "Expenses grew {:.1}% while the period closed at a loss of {:.2}",
                    comparison.expense_growth, -current.profit
                ),
            )
            .with_impact(-current.profit),
        );
    }

    insights
}

fn risk_insight(risk: &FinancialRisk) -> Insight {
    let (kind, confidence, title) = match risk.kind {
        FinancialRiskKind::NegativeCashFlow => {
            (InsightKind::NegativeCashFlow, 95, "Spending more than earning")
        }
        FinancialRiskKind::IncomeDecline => (InsightKind::IncomeDecline, 85, "Income dropped"),
        FinancialRiskKind::ExpensesOutpacingIncome => (
            InsightKind::ExpensesOutpacingIncome,
            80,
            "Expenses growing faster than income",
        ),
        FinancialRiskKind::BudgetExceeded => (InsightKind::BudgetExceeded, 90, "Budget exceeded"),
        FinancialRiskKind::LowCashRunway => (InsightKind::LowCashRunway, 90, "Low cash runway"),
        FinancialRiskKind::ExpenseConcentration => {
            (InsightKind::ExpenseConcentration, 65, "Concentrated spending")
        }
    };
    Insight::new(
        kind,
        risk.severity.into(),
        confidence,
        title,
        risk.message.clone(),
    )
}

/// Highest priority first, then highest confidence, then title; capped at `max`.
pub fn prioritize(mut insights: Vec<Insight>, max: usize) -> Vec<Insight> {
    insights.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.confidence.cmp(&a.confidence))
            .then_with(|| a.title.cmp(&b.title))
    });
    insights.truncate(max);
    insights
}
