use crate::error::{AnalyticsError, Result};
use crate::utils::{add_months, month_end, month_start, parse_period_string};
use chrono::{Datelike, Days, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[schemars(description = "Money coming into the business")]
    Income,
    #[schemars(description = "Money leaving the business")]
    Expense,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[schemars(description = "Registered but not yet settled. Counted only as a pending amount.")]
    Pending,
    #[schemars(description = "Settled. Counted toward income and expense totals.")]
    Completed,
    #[schemars(description = "Voided. Ignored by every calculation.")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionOrigin {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[serde(rename = "type")]
    #[schemars(
        description = "INCOME or EXPENSE. The direction of the money lives here, not in the amount sign."
    )]
    pub kind: TransactionType,

    #[schemars(description = "Absolute monetary amount. Never negative after ingestion.")]
    pub amount: f64,

    #[schemars(description = "Local calendar day of the transaction in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(description = "Free text description, used to recognize recurring suppliers")]
    pub concept: String,

    pub category: String,

    #[serde(default)]
    pub client_id: Option<String>,

    pub payment_method: PaymentMethod,

    pub status: TransactionStatus,

    pub origin: TransactionOrigin,
}

impl Transaction {
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

impl Frequency {
    /// Factor converting one payment into its monthly cost.
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Frequency::Weekly => 52.0 / 12.0,
            Frequency::Monthly => 1.0,
            Frequency::Quarterly => 1.0 / 3.0,
            Frequency::Semiannual => 1.0 / 6.0,
            Frequency::Annual => 1.0 / 12.0,
        }
    }

    /// The `n`-th payment date after `anchor`. Always offset from the anchor, so a payment
    /// on the 31st comes back to the 31st after a short month.
    pub fn nth_after(&self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        let months: u32 = match self {
            Frequency::Weekly => return anchor.checked_add_days(Days::new(7 * u64::from(n))),
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Semiannual => 6,
            Frequency::Annual => 12,
        };
        anchor.checked_add_months(Months::new(months.checked_mul(n)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FixedExpense {
    pub name: String,
    #[schemars(description = "Amount charged on each payment date")]
    pub amount: f64,
    pub frequency: Frequency,
    pub next_payment: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl FixedExpense {
    pub fn monthly_equivalent(&self) -> f64 {
        self.amount.abs() * self.frequency.monthly_factor()
    }

    /// Payment dates falling inside the range, counted forward from `next_payment`.
    pub fn payments_between(&self, range: &DateRange) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        for n in 0.. {
            let Some(due) = self.frequency.nth_after(self.next_payment, n) else {
                break;
            };
            if due > range.end {
                break;
            }
            if due >= range.start {
                dates.push(due);
            }
        }
        dates
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl BudgetPeriod {
    /// The calendar period of this kind that contains `date`. Weeks start on Monday.
    pub fn range_containing(&self, date: NaiveDate) -> DateRange {
        let (start, end) = match self {
            BudgetPeriod::Weekly => {
                let start = date - Days::new(date.weekday().num_days_from_monday() as u64);
                (start, start + Days::new(6))
            }
            BudgetPeriod::Monthly => (month_start(date), month_end(date)),
            BudgetPeriod::Quarterly => {
                let first = month_start(date);
                let start = add_months(first, -(date.month0() as i32 % 3));
                (start, month_end(add_months(start, 2)))
            }
            BudgetPeriod::Annual => {
                let first = month_start(date);
                let start = add_months(first, -(date.month0() as i32));
                (start, month_end(add_months(start, 11)))
            }
        };
        DateRange { start, end }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Budget {
    #[schemars(description = "Expense category this budget caps (matched case-insensitively)")]
    pub category: String,
    pub limit: f64,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinancialGoal {
    pub title: String,
    pub target: f64,
    pub current: f64,
    pub deadline: NaiveDate,
    pub priority: GoalPriority,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[serde(alias = "PAGADO")]
    Paid,
    #[serde(alias = "PENDIENTE")]
    Pending,
    #[serde(alias = "CANCELADO")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sale {
    #[serde(default)]
    pub client_id: Option<String>,
    pub client_name: String,
    pub product: String,
    #[serde(default)]
    pub category: Option<String>,
    pub total: f64,
    #[schemars(description = "PAID (or PAGADO) sales are the only ones counted as revenue")]
    pub status: SaleStatus,
    pub sale_date: NaiveDate,
}

impl Sale {
    pub fn is_paid(&self) -> bool {
        self.status == SaleStatus::Paid
    }

    /// Stable identity of the buyer: the client id when present, else the lowercased name.
    pub fn client_key(&self) -> String {
        match &self.client_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => self.client_name.trim().to_lowercase(),
        }
    }
}

/// Inclusive range of local calendar days, i.e. [start 00:00:00.000, end 23:59:59.999].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(AnalyticsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(period: &str) -> Result<Self> {
        let (start, end) = parse_period_string(period)?;
        Self::new(start, end)
    }

    pub fn month_of(date: NaiveDate) -> Self {
        Self {
            start: month_start(date),
            end: month_end(date),
        }
    }

    /// Month-to-date: from the first of the month through `date`.
    pub fn month_to_date(date: NaiveDate) -> Self {
        Self {
            start: month_start(date),
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The range of the same length immediately before this one. An inverted range
    /// (possible through deserialization) counts as a single day.
    pub fn previous(&self) -> Self {
        let span = self.days().max(1) as u64;
        let end = self.start - Days::new(1);
        let start = end - Days::new(span - 1);
        Self { start, end }
    }

    /// The same calendar span one year earlier.
    pub fn year_ago(&self) -> Self {
        Self {
            start: add_months(self.start, -12),
            end: add_months(self.end, -12),
        }
    }
}
