//! Conversion of loosely typed rows (query results, CSV exports) into the typed model.
//!
//! Rows that cannot be interpreted are skipped with a warning rather than failing the whole
//! batch, so one bad record never hides a month of valid data.

use crate::schema::{
    PaymentMethod, Sale, SaleStatus, Transaction, TransactionOrigin, TransactionStatus,
    TransactionType,
};
use crate::utils::finite_or_zero;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawTransaction {
    #[serde(rename = "type", default)]
    #[schemars(description = "INCOME or EXPENSE. When missing, a negative amount means EXPENSE.")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[schemars(description = "YYYY-MM-DD, RFC 3339, or YYYY-MM-DDTHH:MM:SS[.fff]")]
    pub date: String,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawSale {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    pub sale_date: String,
}

/// Parses a date or timestamp and keeps only the calendar day.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Maps a free-form label onto one of the SCREAMING_SNAKE_CASE enum names (or aliases).
fn parse_label<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let label = raw.trim().to_uppercase().replace([' ', '-'], "_");
    serde_json::from_value(serde_json::Value::String(label)).ok()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn normalize_transactions(rows: &[RawTransaction]) -> Vec<Transaction> {
    let mut transactions = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let Some(date) = parse_day(&row.date) else {
            warn!("Skipping transaction #{}: unreadable date '{}'", idx, row.date);
            continue;
        };

        let raw_amount = finite_or_zero(row.amount.unwrap_or(0.0));
        let kind = match non_blank(&row.kind) {
            Some(label) => match parse_label::<TransactionType>(label) {
                Some(kind) => kind,
                None => {
                    warn!("Skipping transaction #{}: unknown type '{}'", idx, label);
                    continue;
                }
            },
            None if raw_amount < 0.0 => TransactionType::Expense,
            None => TransactionType::Income,
        };

        let status = match non_blank(&row.status) {
            Some(label) => match parse_label::<TransactionStatus>(label) {
                Some(status) => status,
                None => {
                    warn!("Skipping transaction #{}: unknown status '{}'", idx, label);
                    continue;
                }
            },
            None => TransactionStatus::Completed,
        };

        let payment_method = non_blank(&row.payment_method)
            .and_then(parse_label::<PaymentMethod>)
            .unwrap_or(PaymentMethod::Other);
        let origin = non_blank(&row.origin)
            .and_then(parse_label::<TransactionOrigin>)
            .unwrap_or(TransactionOrigin::Manual);

        transactions.push(Transaction {
            kind,
            amount: raw_amount.abs(),
            date,
            concept: non_blank(&row.concept).unwrap_or_default().to_string(),
            category: non_blank(&row.category).unwrap_or_default().to_string(),
            client_id: non_blank(&row.client_id).map(str::to_string),
            payment_method,
            status,
            origin,
        });
    }

    debug!(
        "Normalized {} of {} transaction rows",
        transactions.len(),
        rows.len()
    );
    transactions
}

pub fn normalize_sales(rows: &[RawSale]) -> Vec<Sale> {
    let mut sales = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let Some(sale_date) = parse_day(&row.sale_date) else {
            warn!("Skipping sale #{}: unreadable date '{}'", idx, row.sale_date);
            continue;
        };

        let status = match non_blank(&row.status) {
            Some(label) => match parse_label::<SaleStatus>(label) {
                Some(status) => status,
                None => {
                    warn!("Skipping sale #{}: unknown status '{}'", idx, label);
                    continue;
                }
            },
            None => SaleStatus::Paid,
        };

        sales.push(Sale {
            client_id: non_blank(&row.client_id).map(str::to_string),
            client_name: non_blank(&row.client_name).unwrap_or_default().to_string(),
            product: non_blank(&row.product).unwrap_or_default().to_string(),
            category: non_blank(&row.category).map(str::to_string),
            total: finite_or_zero(row.total.unwrap_or(0.0)).abs(),
            status,
            sale_date,
        });
    }

    debug!("Normalized {} of {} sale rows", sales.len(), rows.len());
    sales
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: Option<&str>, amount: f64, date: &str) -> RawTransaction {
        RawTransaction {
            kind: kind.map(str::to_string),
            amount: Some(amount),
            date: date.to_string(),
            concept: Some("  Office rent ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_day_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_day("2024-03-15"), Some(expected));
        assert_eq!(parse_day("2024-03-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_day("2024-03-15T23:59:59.999"), Some(expected));
        assert_eq!(parse_day("2024-03-15T08:00:00-05:00"), Some(expected));
        assert_eq!(parse_day("15/03/2024"), None);
        assert_eq!(parse_day(""), None);
    }

    #[test]
    fn test_normalize_transactions_defaults_and_signs() {
        let rows = vec![
            raw(Some("expense"), -1200.0, "2024-03-01"),
            raw(None, -50.0, "2024-03-02"),
            raw(None, 300.0, "2024-03-03T12:00:00Z"),
        ];
        let txs = normalize_transactions(&rows);
        assert_eq!(txs.len(), 3);

        assert_eq!(txs[0].kind, TransactionType::Expense);
        assert_eq!(txs[0].amount, 1200.0);
        assert_eq!(txs[0].status, TransactionStatus::Completed);
        assert_eq!(txs[0].origin, TransactionOrigin::Manual);
        assert_eq!(txs[0].payment_method, PaymentMethod::Other);
        assert_eq!(txs[0].concept, "Office rent");

        assert_eq!(txs[1].kind, TransactionType::Expense);
        assert_eq!(txs[1].amount, 50.0);
        assert_eq!(txs[2].kind, TransactionType::Income);
    }

    #[test]
    fn test_normalize_transactions_skips_bad_rows() {
        let mut unknown_status = raw(Some("INCOME"), 10.0, "2024-03-01");
        unknown_status.status = Some("refunded".to_string());
        let mut nan = raw(Some("INCOME"), f64::NAN, "2024-03-01");
        nan.status = Some("pending".to_string());
        nan.payment_method = Some("card".to_string());

        let rows = vec![
            raw(Some("INCOME"), 10.0, "not a date"),
            raw(Some("TRANSFER"), 10.0, "2024-03-01"),
            unknown_status,
            nan,
        ];
        let txs = normalize_transactions(&rows);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, 0.0);
        assert_eq!(txs[0].status, TransactionStatus::Pending);
        assert_eq!(txs[0].payment_method, PaymentMethod::Card);
    }

    #[test]
    fn test_normalize_sales_accepts_localized_status() {
        let rows = vec![
            RawSale {
                client_name: Some("Acme".to_string()),
                product: Some("Widget".to_string()),
                total: Some(250.0),
                status: Some("pagado".to_string()),
                sale_date: "2024-03-05".to_string(),
                ..Default::default()
            },
            RawSale {
                client_name: Some("Globex".to_string()),
                category: Some("   ".to_string()),
                total: None,
                sale_date: "2024-03-06T09:00:00Z".to_string(),
                ..Default::default()
            },
            RawSale {
                status: Some("lost".to_string()),
                sale_date: "2024-03-07".to_string(),
                ..Default::default()
            },
        ];
        let sales = normalize_sales(&rows);
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].status, SaleStatus::Paid);
        assert_eq!(sales[1].status, SaleStatus::Paid);
        assert_eq!(sales[1].total, 0.0);
        assert_eq!(sales[1].category, None);
    }
}
