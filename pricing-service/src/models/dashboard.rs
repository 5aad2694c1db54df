//! Dashboard aggregation.
//!
//! Stores only report raw facts; [`summarize`] folds them into the payload so
//! every backend produces identical numbers.

use super::money::to_money;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Number of months reported in the revenue trend.
pub const TREND_MONTHS: u32 = 12;

/// Paid revenue for one plan in one calendar month.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RevenueBucket {
    pub plan_name: String,
    /// First day of the month the revenue is attributed to.
    pub month: NaiveDate,
    pub revenue: Decimal,
}

/// Raw counts and revenue buckets collected by a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFacts {
    pub total_customers: i64,
    pub active_subscriptions: i64,
    pub trial_subscriptions: i64,
    pub pending_invoices: i64,
    pub overdue_invoices: i64,
    pub popular_plan: Option<String>,
    pub paid_revenue: Vec<RevenueBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_customers: i64,
    pub active_subscriptions: i64,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub pending_invoices: i64,
    pub overdue_invoices: i64,
    pub trial_subscriptions: i64,
    pub popular_plan: Option<String>,
    pub revenue_by_plan: BTreeMap<String, Decimal>,
    pub monthly_revenue_trend: Vec<MonthlyRevenue>,
}

/// First day of the month `offset` months before the month containing `day`.
fn month_start(day: NaiveDate, offset: u32) -> NaiveDate {
    let index = day.year() * 12 + day.month0() as i32 - offset as i32;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(NaiveDate::MIN)
}

/// Fold store facts into the dashboard payload as of `today` (UTC).
pub fn summarize(facts: DashboardFacts, today: NaiveDate) -> DashboardSummary {
    let current_month = month_start(today, 0);

    let mut total_revenue = Decimal::ZERO;
    let mut by_plan: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_month: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

    for bucket in &facts.paid_revenue {
        total_revenue += bucket.revenue;
        *by_plan.entry(bucket.plan_name.clone()).or_default() += bucket.revenue;
        *by_month.entry(month_start(bucket.month, 0)).or_default() += bucket.revenue;
    }

    let monthly_revenue_trend = (0..TREND_MONTHS)
        .rev()
        .map(|offset| {
            let month = month_start(today, offset);
            MonthlyRevenue {
                month: month.format("%Y-%m").to_string(),
                revenue: to_money(by_month.get(&month).copied().unwrap_or_default()),
            }
        })
        .collect();

    DashboardSummary {
        total_customers: facts.total_customers,
        active_subscriptions: facts.active_subscriptions,
        total_revenue: to_money(total_revenue),
        monthly_revenue: to_money(by_month.get(&current_month).copied().unwrap_or_default()),
        pending_invoices: facts.pending_invoices,
        overdue_invoices: facts.overdue_invoices,
        trial_subscriptions: facts.trial_subscriptions,
        popular_plan: facts.popular_plan,
        revenue_by_plan: by_plan
            .into_iter()
            .filter(|(_, revenue)| !revenue.is_zero())
            .map(|(name, revenue)| (name, to_money(revenue)))
            .collect(),
        monthly_revenue_trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bucket(plan: &str, month: NaiveDate, revenue: &str) -> RevenueBucket {
        RevenueBucket {
            plan_name: plan.to_string(),
            month,
            revenue: d(revenue),
        }
    }

    #[test]
    fn empty_facts_produce_zeroed_summary() {
        let summary = summarize(DashboardFacts::default(), date(2024, 6, 15));
        assert_eq!(summary.total_revenue.to_string(), "0.00");
        assert_eq!(summary.monthly_revenue.to_string(), "0.00");
        assert!(summary.popular_plan.is_none());
        assert!(summary.revenue_by_plan.is_empty());
        assert_eq!(summary.monthly_revenue_trend.len(), 12);
        assert!(summary
            .monthly_revenue_trend
            .iter()
            .all(|m| m.revenue.to_string() == "0.00"));
    }

    #[test]
    fn revenue_is_split_by_plan_and_month() {
        let facts = DashboardFacts {
            paid_revenue: vec![
                bucket("Basic", date(2024, 6, 1), "100.00"),
                bucket("Pro", date(2024, 6, 1), "50.00"),
                bucket("Basic", date(2024, 1, 1), "25.50"),
                bucket("Basic", date(2022, 1, 1), "10.00"),
            ],
            ..Default::default()
        };
        let summary = summarize(facts, date(2024, 6, 30));

        assert_eq!(summary.total_revenue.to_string(), "185.50");
        assert_eq!(summary.monthly_revenue.to_string(), "150.00");
        assert_eq!(summary.revenue_by_plan["Basic"].to_string(), "135.50");
        assert_eq!(summary.revenue_by_plan["Pro"].to_string(), "50.00");

        let trend = &summary.monthly_revenue_trend;
        assert_eq!(trend.first().unwrap().month, "2023-07");
        assert_eq!(trend.last().unwrap().month, "2024-06");
        assert_eq!(trend.last().unwrap().revenue.to_string(), "150.00");
        let january = trend.iter().find(|m| m.month == "2024-01").unwrap();
        assert_eq!(january.revenue.to_string(), "25.50");
    }

    #[test]
    fn trend_crosses_year_boundary() {
        let summary = summarize(DashboardFacts::default(), date(2024, 2, 10));
        let months: Vec<&str> = summary
            .monthly_revenue_trend
            .iter()
            .map(|m| m.month.as_str())
            .collect();
        assert_eq!(months[0], "2023-03");
        assert_eq!(months[10], "2024-01");
        assert_eq!(months[11], "2024-02");
    }

    #[test]
    fn counts_pass_through() {
        let facts = DashboardFacts {
            total_customers: 3,
            active_subscriptions: 2,
            trial_subscriptions: 1,
            pending_invoices: 4,
            overdue_invoices: 1,
            popular_plan: Some("Pro".to_string()),
            paid_revenue: vec![],
        };
        let summary = summarize(facts, date(2024, 6, 1));
        assert_eq!(summary.total_customers, 3);
        assert_eq!(summary.active_subscriptions, 2);
        assert_eq!(summary.trial_subscriptions, 1);
        assert_eq!(summary.pending_invoices, 4);
        assert_eq!(summary.overdue_invoices, 1);
        assert_eq!(summary.popular_plan.as_deref(), Some("Pro"));
    }
}
