//! # Ledger Pulse
//!
//! Deterministic analytics for small-business finance and sales data: period totals,
//! growth and trends, recurring expense detection, forecasts, what-if scenarios, risk and
//! anomaly detection, goal and budget tracking, and ranked recommendations.
//!
//! ## Core Concepts
//!
//! - **Transactions**: completed, pending or cancelled income and expenses. Amounts are
//!   absolute and the type carries the direction.
//! - **Sales**: per-client sales records; only PAID sales count as revenue.
//! - **Policy**: every threshold and multiplier lives in [`AnalyticsPolicy`], validated once.
//! - **Purity**: every calculation is a function of its inputs and `as_of`. Nothing reads
//!   the clock or performs I/O.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use ledger_pulse::*;
//!
//! fn main() -> ledger_pulse::Result<()> {
//!     let raw_rows = vec![
//!         RawTransaction {
//!             kind: Some("INCOME".to_string()),
//!             amount: Some(4_200.0),
//!             date: "2024-04-02".to_string(),
//!             concept: Some("Retainer".to_string()),
//!             ..Default::default()
//!         },
//!         RawTransaction {
//!             amount: Some(-1_500.0),
//!             date: "2024-04-01T09:00:00Z".to_string(),
//!             concept: Some("Office rent".to_string()),
//!             category: Some("Rent".to_string()),
//!             ..Default::default()
//!         },
//!     ];
//!
//!     let input = DashboardInput {
//!         as_of: NaiveDate::from_ymd_opt(2024, 4, 15).expect("valid date"),
//!         transactions: normalize_transactions(&raw_rows),
//!         fixed_expenses: vec![],
//!         budgets: vec![],
//!         goals: vec![],
//!         sales: vec![],
//!         current_cash: 12_000.0,
//!         monthly_revenue_target: Some(8_000.0),
//!     };
//!
//!     let report = analyze_dashboard(&input)?;
//!     for insight in &report.insights {
//!         println!("[{:?}] {}", insight.priority, insight.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod goals;
pub mod ingestion;
pub mod insights;
pub mod policy;
pub mod recurring;
pub mod risk;
pub mod sales;
pub mod scenario;
pub mod schema;
pub mod trend;
pub mod utils;

pub use aggregator::{
    aggregate_period, aggregate_sales, expenses_by_category, monthly_sales_revenue,
    monthly_totals, CategoryTotal, MonthlyTotals, PeriodSummary, SalesSummary,
};
pub use dashboard::{analyze_dashboard, DashboardAnalyzer, DashboardInput, DashboardReport};
pub use error::{AnalyticsError, Result};
pub use forecast::*;
pub use goals::*;
pub use ingestion::*;
pub use insights::{
    build_financial_insights, build_sales_insights, prioritize, Insight, InsightKind,
    InsightPriority,
};
pub use policy::*;
pub use recurring::*;
pub use risk::*;
pub use sales::{analyze_sales, RankedItem, SalesMetrics};
pub use scenario::*;
pub use schema::*;
pub use trend::*;
pub use utils::*;
