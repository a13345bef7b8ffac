use crate::policy::RecurringPolicy;
use crate::schema::{FixedExpense, Transaction, TransactionStatus};
use crate::utils::{coefficient_of_variation, finite_or_zero, mean, normalize_key};
use chrono::{Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringFrequency {
    Weekly,
    Monthly,
    Quarterly,
}

impl RecurringFrequency {
    /// Classifies a mean payment interval, in days.
    pub fn from_interval(days: f64) -> Option<Self> {
        if (5.0..=10.0).contains(&days) {
            Some(Self::Weekly)
        } else if (25.0..=35.0).contains(&days) {
            Some(Self::Monthly)
        } else if (85.0..=100.0).contains(&days) {
            Some(Self::Quarterly)
        } else {
            None
        }
    }

    pub fn interval_days(&self) -> u64 {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 91,
        }
    }

    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 52.0 / 12.0,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
        }
    }
}

/// A payment pattern recognized in the transaction history. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRecurringExpense {
    pub supplier: String,
    pub average_amount: f64,
    pub frequency: RecurringFrequency,
    pub occurrences: usize,
    pub last_payment: NaiveDate,
    pub next_estimated_payment: NaiveDate,
    pub category: String,
    pub monthly_equivalent: f64,
}

/// Finds suppliers charged at a regular interval with a stable amount.
pub fn detect_recurring_expenses(
    transactions: &[Transaction],
    policy: &RecurringPolicy,
) -> Vec<DetectedRecurringExpense> {
    let mut groups: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        if !tx.is_expense() || tx.status == TransactionStatus::Cancelled {
            continue;
        }
        let key = normalize_key(&tx.concept);
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(tx);
    }

    let mut detected: Vec<DetectedRecurringExpense> = groups
        .into_iter()
        .filter_map(|(key, mut rows)| {
            rows.sort_by_key(|t| t.date);
            let result = evaluate_group(&rows, policy);
            if result.is_none() {
                debug!("'{}' rejected as recurring ({} payments)", key, rows.len());
            }
            result
        })
        .collect();

    detected.sort_by(|a, b| {
        b.monthly_equivalent
            .total_cmp(&a.monthly_equivalent)
            .then_with(|| a.supplier.cmp(&b.supplier))
    });
    detected
}

fn evaluate_group(
    rows: &[&Transaction],
    policy: &RecurringPolicy,
) -> Option<DetectedRecurringExpense> {
    if rows.len() < policy.min_occurrences.max(2) {
        return None;
    }

    let intervals: Vec<f64> = rows
        .windows(2)
        .map(|pair| (pair[1].date - pair[0].date).num_days() as f64)
        .collect();
    let mean_interval = mean(&intervals);
    if mean_interval <= 0.0 {
        return None;
    }
    if coefficient_of_variation(&intervals) > policy.max_interval_cv {
        return None;
    }
    let frequency = RecurringFrequency::from_interval(mean_interval)?;

    let amounts: Vec<f64> = rows
        .iter()
        .map(|t| finite_or_zero(t.amount).abs())
        .collect();
    let average_amount = mean(&amounts);
    let tolerance = average_amount * policy.amount_tolerance;
    if amounts
        .iter()
        .any(|a| (a - average_amount).abs() > tolerance)
    {
        return None;
    }

    let last = rows[rows.len() - 1];
    Some(DetectedRecurringExpense {
        supplier: last.concept.trim().to_string(),
        average_amount,
        frequency,
        occurrences: rows.len(),
        last_payment: last.date,
        next_estimated_payment: last.date + Days::new(frequency.interval_days()),
        category: last.category.clone(),
        monthly_equivalent: average_amount * frequency.monthly_factor(),
    })
}

/// Detections that no active fixed expense accounts for yet.
pub fn unregistered_recurring(
    detected: &[DetectedRecurringExpense],
    fixed_expenses: &[FixedExpense],
) -> Vec<DetectedRecurringExpense> {
    detected
        .iter()
        .filter(|d| {
            let supplier = normalize_key(&d.supplier);
            !fixed_expenses
                .iter()
                .any(|f| f.active && normalize_key(&f.name) == supplier)
        })
        .cloned()
        .collect()
}
