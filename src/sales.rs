use crate::aggregator::{aggregate_sales, SalesSummary};
use crate::schema::{DateRange, Sale};
use crate::trend::growth_rate_opt;
use crate::utils::{finite_or_zero, safe_div};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub name: String,
    pub revenue: f64,
    pub count: usize,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMetrics {
    pub range: DateRange,
    pub current: SalesSummary,
    pub previous: SalesSummary,
    /// `None` when the previous period had nothing to compare against.
    pub revenue_growth: Option<f64>,
    pub count_growth: Option<f64>,
    pub ticket_growth: Option<f64>,
    pub top_products: Vec<RankedItem>,
    pub top_clients: Vec<RankedItem>,
    pub categories: Vec<RankedItem>,
    /// Share of paying clients with two or more paid sales in the range.
    pub repeat_customer_rate: f64,
    pub top_client_share_pct: f64,
    pub top_category_share_pct: f64,
}

/// Paid-sales metrics for a range, compared with the equally long range before it.
pub fn analyze_sales(sales: &[Sale], range: &DateRange, top_n: usize) -> SalesMetrics {
    let current = aggregate_sales(sales, range);
    let previous = aggregate_sales(sales, &range.previous());

    let paid: Vec<&Sale> = sales
        .iter()
        .filter(|s| s.is_paid() && range.contains(s.sale_date))
        .collect();

    let by_client = rank(&paid, current.revenue, |s| {
        (s.client_key(), s.client_name.trim().to_string())
    });
    let repeat_clients = by_client.iter().filter(|c| c.count >= 2).count();
    let repeat_customer_rate = safe_div(repeat_clients as f64, by_client.len() as f64) * 100.0;

    let categories = rank(&paid, current.revenue, |s| {
        let name = s
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("Uncategorized");
        (name.to_lowercase(), name.to_string())
    });
    let top_products = rank(&paid, current.revenue, |s| {
        (s.product.trim().to_lowercase(), s.product.trim().to_string())
    });

    SalesMetrics {
        range: *range,
        revenue_growth: growth_rate_opt(current.revenue, previous.revenue),
        count_growth: growth_rate_opt(current.count as f64, previous.count as f64),
        ticket_growth: growth_rate_opt(current.average_ticket, previous.average_ticket),
        top_client_share_pct: by_client.first().map(|c| c.share_pct).unwrap_or(0.0),
        top_category_share_pct: categories.first().map(|c| c.share_pct).unwrap_or(0.0),
        top_products: top_products.into_iter().take(top_n).collect(),
        top_clients: by_client.into_iter().take(top_n).collect(),
        categories,
        repeat_customer_rate,
        current,
        previous,
    }
}

/// Groups by the key half of `key_fn`, labeling each group with the label of its first
/// sale. Sorted by revenue descending, then by name.
fn rank<F>(sales: &[&Sale], total_revenue: f64, key_fn: F) -> Vec<RankedItem>
where
    F: Fn(&Sale) -> (String, String),
{
    let mut groups: BTreeMap<String, RankedItem> = BTreeMap::new();
    for &sale in sales {
        let (key, label) = key_fn(sale);
        let entry = groups.entry(key).or_insert_with(|| RankedItem {
            name: label,
            revenue: 0.0,
            count: 0,
            share_pct: 0.0,
        });
        entry.revenue += finite_or_zero(sale.total).abs();
        entry.count += 1;
    }

    let mut items: Vec<RankedItem> = groups
        .into_values()
        .map(|mut item| {
            item.share_pct = safe_div(item.revenue, total_revenue) * 100.0;
            item
        })
        .collect();
    items.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.name.cmp(&b.name))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SaleStatus;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(client: &str, product: &str, category: &str, total: f64, on: NaiveDate) -> Sale {
        Sale {
            client_id: None,
            client_name: client.to_string(),
            product: product.to_string(),
            category: Some(category.to_string()),
            total,
            status: SaleStatus::Paid,
            sale_date: on,
        }
    }

    #[test]
    fn test_analyze_sales_rankings_and_rates() {
        let mut cancelled = sale("Zed", "Gadget", "Hardware", 5000.0, date(2024, 3, 9));
        cancelled.status = SaleStatus::Cancelled;
        let sales = vec![
            sale("Acme", "Consulting", "Services", 600.0, date(2024, 3, 2)),
            sale("Acme", "Consulting", "Services", 400.0, date(2024, 3, 12)),
            sale("Globex", "Widget", "Hardware", 500.0, date(2024, 3, 5)),
            sale("Initech", "Widget", "Hardware", 500.0, date(2024, 3, 7)),
            cancelled,
            // Previous period (Jan 30 - Feb 29).
            sale("Acme", "Consulting", "Services", 1000.0, date(2024, 2, 15)),
        ];

        let metrics = analyze_sales(&sales, &DateRange::month_of(date(2024, 3, 1)), 2);
        assert_eq!(metrics.current.revenue, 2000.0);
        assert_eq!(metrics.current.count, 4);
        assert_eq!(metrics.current.unique_clients, 3);
        assert_eq!(metrics.revenue_growth, Some(100.0));
        assert_eq!(metrics.count_growth, Some(300.0));
        assert_eq!(metrics.ticket_growth, Some(-50.0));

        assert_eq!(metrics.top_clients.len(), 2);
        assert_eq!(metrics.top_clients[0].name, "Acme");
        assert_eq!(metrics.top_clients[0].count, 2);
        assert_eq!(metrics.top_client_share_pct, 50.0);
        assert!((metrics.repeat_customer_rate - 100.0 / 3.0).abs() < 1e-9);

        assert_eq!(metrics.top_products[0].name, "Consulting");
        assert_eq!(metrics.top_products[1].name, "Widget");
        assert_eq!(metrics.categories.len(), 2);
        assert_eq!(metrics.top_category_share_pct, 50.0);
    }

    #[test]
    fn test_analyze_sales_without_history() {
        let sales = vec![sale("Acme", "Widget", "", 250.0, date(2024, 3, 2))];
        let metrics = analyze_sales(&sales, &DateRange::month_of(date(2024, 3, 1)), 5);
        assert_eq!(metrics.revenue_growth, None);
        assert_eq!(metrics.categories[0].name, "Uncategorized");
        assert_eq!(metrics.repeat_customer_rate, 0.0);

        let empty = analyze_sales(&[], &DateRange::month_of(date(2024, 3, 1)), 5);
        assert_eq!(empty.top_client_share_pct, 0.0);
        assert!(empty.top_products.is_empty());
    }

    #[test]
    fn test_analyze_sales_inverted_range_is_empty() {
        let range: DateRange =
            serde_json::from_str(r#"{"start":"2024-03-10","end":"2024-03-09"}"#).unwrap();
        let sales = vec![sale("Acme", "Widget", "Hardware", 120.0, date(2024, 3, 9))];

        let metrics = analyze_sales(&sales, &range, 5);
        assert_eq!(metrics.current.revenue, 0.0);
        assert_eq!(metrics.current.count, 0);
        assert_eq!(metrics.previous.revenue, 120.0);
        assert_eq!(metrics.revenue_growth, Some(-100.0));
        assert!(metrics.top_clients.is_empty());

        let empty = analyze_sales(&[], &range, 5);
        assert_eq!(empty.current.revenue, 0.0);
        assert_eq!(empty.revenue_growth, None);
    }
}
