use crate::schema::{DateRange, Sale, SaleStatus, Transaction, TransactionStatus, TransactionType};
use crate::utils::{finite_or_zero, month_end, safe_div, trailing_month_starts};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub income: f64,
    /// Absolute value of completed expenses.
    pub expenses: f64,
    pub profit: f64,
    /// Absolute sum of pending income and pending expenses.
    pub pending_amount: f64,
    pub income_count: usize,
    pub expense_count: usize,
    pub transaction_count: usize,
    pub average_income: f64,
    pub average_expense: f64,
}

impl PeriodSummary {
    /// Profit as a percentage of income.
    pub fn margin_pct(&self) -> f64 {
        safe_div(self.profit, self.income) * 100.0
    }
}

pub fn aggregate_period(transactions: &[Transaction], range: &DateRange) -> PeriodSummary {
    let mut summary = PeriodSummary::default();

    for tx in transactions.iter().filter(|t| range.contains(t.date)) {
        let amount = finite_or_zero(tx.amount).abs();
        match tx.status {
            TransactionStatus::Cancelled => continue,
            TransactionStatus::Pending => summary.pending_amount += amount,
            TransactionStatus::Completed => match tx.kind {
                TransactionType::Income => {
                    summary.income += amount;
                    summary.income_count += 1;
                }
                TransactionType::Expense => {
                    summary.expenses += amount;
                    summary.expense_count += 1;
                }
            },
        }
        summary.transaction_count += 1;
    }

    summary.profit = summary.income - summary.expenses;
    summary.average_income = safe_div(summary.income, summary.income_count as f64);
    summary.average_expense = safe_div(summary.expenses, summary.expense_count as f64);
    summary
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub revenue: f64,
    pub count: usize,
    pub average_ticket: f64,
    pub pending_amount: f64,
    pub unique_clients: usize,
}

pub fn aggregate_sales(sales: &[Sale], range: &DateRange) -> SalesSummary {
    let mut summary = SalesSummary::default();
    let mut clients = BTreeSet::new();

    for sale in sales.iter().filter(|s| range.contains(s.sale_date)) {
        let total = finite_or_zero(sale.total).abs();
        match sale.status {
            SaleStatus::Paid => {
                summary.revenue += total;
                summary.count += 1;
                clients.insert(sale.client_key());
            }
            SaleStatus::Pending => summary.pending_amount += total,
            SaleStatus::Cancelled => {}
        }
    }

    summary.average_ticket = safe_div(summary.revenue, summary.count as f64);
    summary.unique_clients = clients.len();
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    /// First day of the month.
    pub month: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub profit: f64,
}

/// Completed income and expenses for the `months` calendar months ending with the month
/// of `as_of`, oldest first. Months without activity are present with zeros.
pub fn monthly_totals(
    transactions: &[Transaction],
    as_of: NaiveDate,
    months: u32,
) -> Vec<MonthlyTotals> {
    trailing_month_starts(as_of, months)
        .into_iter()
        .map(|month| {
            let range = DateRange {
                start: month,
                end: month_end(month),
            };
            let summary = aggregate_period(transactions, &range);
            MonthlyTotals {
                month,
                income: summary.income,
                expenses: summary.expenses,
                profit: summary.profit,
            }
        })
        .collect()
}

pub fn monthly_sales_revenue(sales: &[Sale], as_of: NaiveDate, months: u32) -> Vec<f64> {
    trailing_month_starts(as_of, months)
        .into_iter()
        .map(|month| {
            let range = DateRange {
                start: month,
                end: month_end(month),
            };
            aggregate_sales(sales, &range).revenue
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
    pub share_pct: f64,
}

/// Completed expenses per category, largest first.
pub fn expenses_by_category(
    transactions: &[Transaction],
    range: &DateRange,
) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|t| t.is_expense() && t.is_completed() && range.contains(t.date))
    {
        let category = match tx.category.trim() {
            "" => "Uncategorized".to_string(),
            other => other.to_string(),
        };
        *totals.entry(category).or_default() += finite_or_zero(tx.amount).abs();
    }

    let grand_total: f64 = totals.values().sum();
    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category,
            amount,
            share_pct: safe_div(amount, grand_total) * 100.0,
        })
        .collect();

    categories.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    categories
}
