//! Thresholds and multipliers used by the analytics layer.
//!
//! Every number here is a fixed heuristic rather than a statistically derived value. The
//! defaults reproduce the dashboard's behavior; callers may tune them and must run
//! [`AnalyticsPolicy::validate`] (done by [`crate::DashboardAnalyzer::new`]) before use.

use crate::error::{AnalyticsError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalyticsPolicy {
    pub recurring: RecurringPolicy,
    pub forecast: ForecastPolicy,
    pub anomaly: AnomalyPolicy,
    pub goal: GoalPolicy,
    pub budget: BudgetPolicy,
    pub insight: InsightPolicy,
    pub risk: RiskPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecurringPolicy {
    #[schemars(description = "Minimum payments sharing a concept before a group is considered")]
    pub min_occurrences: usize,
    #[schemars(description = "Maximum coefficient of variation of the payment intervals")]
    pub max_interval_cv: f64,
    #[schemars(description = "Allowed relative distance of every amount from the group mean")]
    pub amount_tolerance: f64,
}

impl Default for RecurringPolicy {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            max_interval_cv: 0.35,
            amount_tolerance: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForecastPolicy {
    #[schemars(description = "Trailing periods averaged by the moving average")]
    pub window: usize,
    #[schemars(description = "Absolute cap, in percent, applied to the regression trend factor")]
    pub trend_clamp_pct: f64,
    pub conservative_multiplier: f64,
    pub optimistic_multiplier: f64,
    #[schemars(description = "Calendar months of history fed to the projections")]
    pub history_months: u32,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            window: 3,
            trend_clamp_pct: 50.0,
            conservative_multiplier: 0.9,
            optimistic_multiplier: 1.1,
            history_months: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnomalyPolicy {
    pub baseline_days: u32,
    #[schemars(
        description = "Deviation from the baseline, in percent, beyond which an anomaly is raised"
    )]
    pub threshold_pct: f64,
    #[schemars(description = "Deviation, in percent, at which an anomaly becomes HIGH severity")]
    pub high_severity_pct: f64,
    #[schemars(
        description = "Multiple of a client's usual purchase gap after which it is inactive"
    )]
    pub inactivity_multiplier: f64,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            baseline_days: 30,
            threshold_pct: 30.0,
            high_severity_pct: 50.0,
            inactivity_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GoalPolicy {
    #[schemars(
        description = "Share of the target a projection must reach to be WARNING instead of RISK"
    )]
    pub warning_ratio: f64,
}

impl Default for GoalPolicy {
    fn default() -> Self {
        Self { warning_ratio: 0.8 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BudgetPolicy {
    pub warning_pct: f64,
    pub exceeded_pct: f64,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            warning_pct: 80.0,
            exceeded_pct: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InsightPolicy {
    pub max_insights: usize,
    pub repeat_customer_pct: f64,
    pub category_dominance_pct: f64,
    pub client_concentration_pct: f64,
    pub revenue_decline_pct: f64,
    pub momentum_pct: f64,
    pub reinvest_margin_pct: f64,
}

impl Default for InsightPolicy {
    fn default() -> Self {
        Self {
            max_insights: 5,
            repeat_customer_pct: 30.0,
            category_dominance_pct: 40.0,
            client_concentration_pct: 30.0,
            revenue_decline_pct: -10.0,
            momentum_pct: 20.0,
            reinvest_margin_pct: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RiskPolicy {
    pub income_decline_pct: f64,
    #[schemars(description = "Percentage points by which expense growth may exceed income growth")]
    pub expense_outpace_pp: f64,
    pub runway_months: f64,
    pub category_concentration_pct: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            income_decline_pct: -20.0,
            expense_outpace_pp: 10.0,
            runway_months: 3.0,
            category_concentration_pct: 50.0,
        }
    }
}

impl AnalyticsPolicy {
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.recurring;
        ensure(
            r.min_occurrences >= 2,
            "recurring.min_occurrences",
            r.min_occurrences as f64,
            "at least two payments are needed to measure an interval",
        )?;
        ensure(
            r.max_interval_cv > 0.0,
            "recurring.max_interval_cv",
            r.max_interval_cv,
            "must be positive",
        )?;
        ensure(
            r.amount_tolerance > 0.0 && r.amount_tolerance < 1.0,
            "recurring.amount_tolerance",
            r.amount_tolerance,
            "must be between 0 and 1",
        )?;

        let f = &self.forecast;
        ensure(f.window > 0, "forecast.window", f.window as f64, "must be at least 1")?;
        ensure(
            f.trend_clamp_pct >= 0.0,
            "forecast.trend_clamp_pct",
            f.trend_clamp_pct,
            "must not be negative",
        )?;
        ensure(
            f.conservative_multiplier > 0.0,
            "forecast.conservative_multiplier",
            f.conservative_multiplier,
            "must be positive",
        )?;
        ensure(
            f.conservative_multiplier <= f.optimistic_multiplier,
            "forecast.conservative_multiplier",
            f.conservative_multiplier,
            "must not exceed the optimistic multiplier",
        )?;
        ensure(
            f.history_months > 0,
            "forecast.history_months",
            f.history_months as f64,
            "must be at least 1",
        )?;

        let a = &self.anomaly;
        ensure(
            a.baseline_days > 0,
            "anomaly.baseline_days",
            a.baseline_days as f64,
            "must be at least 1",
        )?;
        ensure(
            a.threshold_pct > 0.0,
            "anomaly.threshold_pct",
            a.threshold_pct,
            "must be positive",
        )?;
        ensure(
            a.high_severity_pct >= a.threshold_pct,
            "anomaly.high_severity_pct",
            a.high_severity_pct,
            "must not be below the anomaly threshold",
        )?;
        ensure(
            a.inactivity_multiplier >= 1.0,
            "anomaly.inactivity_multiplier",
            a.inactivity_multiplier,
            "must be at least 1",
        )?;

        ensure(
            self.goal.warning_ratio > 0.0 && self.goal.warning_ratio <= 1.0,
            "goal.warning_ratio",
            self.goal.warning_ratio,
            "must be in (0, 1]",
        )?;

        let b = &self.budget;
        ensure(
            b.warning_pct > 0.0 && b.warning_pct <= b.exceeded_pct,
            "budget.warning_pct",
            b.warning_pct,
            "must be positive and not above the exceeded threshold",
        )?;

        ensure(
            self.insight.max_insights > 0,
            "insight.max_insights",
            self.insight.max_insights as f64,
            "must be at least 1",
        )?;
        ensure(
            self.risk.runway_months > 0.0,
            "risk.runway_months",
            self.risk.runway_months,
            "must be positive",
        )?;

        Ok(())
    }
}

fn ensure(condition: bool, field: &'static str, value: f64, reason: &'static str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidPolicy {
            field,
            value,
            reason,
        })
    }
}
