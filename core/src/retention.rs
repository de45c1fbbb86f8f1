//! Recency, churn and repeat-purchase analysis.
//!
//! RULE: Recency is measured in whole days back from the latest
//! timestamp in the whole dataset, never from the wall clock.

use crate::{
    error::GroceryResult,
    segmentation::{median, summarize_customers, CustomerSummary, Tertiles},
    table::{Table, Value},
    view::{ReportView, ViewContext},
};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

pub const FREQUENCY_TIERS: [&str; 3] = ["Low", "Medium", "High"];

pub fn days_since(summary: &CustomerSummary, reference: NaiveDateTime) -> i64 {
    summary
        .last_purchase()
        .map(|ts| (reference - ts).num_days())
        .unwrap_or(0)
}

/// Recency band: Low ≤ 30 < Medium ≤ 60 < High ≤ 90 < Very High.
pub fn churn_band(days: i64) -> &'static str {
    match days {
        d if d <= 30 => "Low",
        d if d <= 60 => "Medium",
        d if d <= 90 => "High",
        _ => "Very High",
    }
}

// ── Views ───────────────────────────────────────────────────────────────────

/// Per-customer recency with churn flag and band.
pub struct RetentionAnalysis;

impl ReportView for RetentionAnalysis {
    fn name(&self) -> &'static str {
        "retention"
    }

    fn title(&self) -> &'static str {
        "Customer Retention"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let reference = ctx.dataset.max_datetime();
        let mut table = Table::with_columns(
            self.name(),
            &[
                "customer_id",
                "loyalty_member",
                "transaction_count",
                "last_purchase",
                "days_since_purchase",
                "churned",
                "churn_risk",
            ],
        );
        for c in summarize_customers(ctx.dataset.lines()) {
            let days = days_since(&c, reference);
            table.push_row(vec![
                Value::Text(c.customer_id.clone()),
                Value::Bool(c.loyalty_member),
                Value::Int(c.transactions() as i64),
                c.last_purchase()
                    .map(|ts| Value::Date(ts.date()))
                    .unwrap_or(Value::Missing),
                Value::Int(days),
                Value::Bool(days > ctx.config.churn_threshold_days),
                Value::Text(churn_band(days).into()),
            ]);
        }
        Ok(table)
    }
}

/// Mean whole-day gap between consecutive purchases per customer.
pub struct PurchaseGaps;

impl ReportView for PurchaseGaps {
    fn name(&self) -> &'static str {
        "purchase_gaps"
    }

    fn title(&self) -> &'static str {
        "Days Between Purchases"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let mut table = Table::with_columns(
            self.name(),
            &["customer_id", "purchases", "avg_days_between", "max_days_between"],
        );
        for c in summarize_customers(ctx.dataset.lines()) {
            let gaps = c.gaps_in_days();
            let (avg, max) = if gaps.is_empty() {
                (Value::Missing, Value::Missing)
            } else {
                let sum: i64 = gaps.iter().sum();
                (
                    Value::number(sum as f64 / gaps.len() as f64),
                    gaps.iter().max().map(|m| Value::Int(*m)).unwrap_or(Value::Missing),
                )
            };
            table.push_row(vec![
                Value::Text(c.customer_id.clone()),
                Value::Int(c.transactions() as i64),
                avg,
                max,
            ]);
        }
        Ok(table)
    }
}

/// Idle customers whose spend is above the median, biggest spenders first.
pub struct AtRiskCustomers;

impl ReportView for AtRiskCustomers {
    fn name(&self) -> &'static str {
        "at_risk_customers"
    }

    fn title(&self) -> &'static str {
        "High-Value Customers at Risk"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let reference = ctx.dataset.max_datetime();
        let customers = summarize_customers(ctx.dataset.lines());
        let spend: Vec<f64> = customers.iter().map(|c| c.total_spend).collect();
        let median_spend = median(&spend).unwrap_or(0.0);

        let mut at_risk: Vec<(&CustomerSummary, i64)> = customers
            .iter()
            .map(|c| (c, days_since(c, reference)))
            .filter(|(c, days)| {
                *days > ctx.config.at_risk_idle_days && c.total_spend > median_spend
            })
            .collect();
        at_risk.sort_by(|a, b| b.0.total_spend.total_cmp(&a.0.total_spend));

        let mut table = Table::with_columns(
            self.name(),
            &[
                "customer_id",
                "days_since_purchase",
                "total_spend",
                "transaction_count",
                "loyalty_member",
            ],
        );
        for (c, days) in at_risk {
            table.push_row(vec![
                Value::Text(c.customer_id.clone()),
                Value::Int(days),
                Value::number(c.total_spend),
                Value::Int(c.transactions() as i64),
                Value::Bool(c.loyalty_member),
            ]);
        }
        Ok(table)
    }
}

/// Customer counts and churn share per purchase-frequency tertile.
pub struct RetentionBySegment;

impl ReportView for RetentionBySegment {
    fn name(&self) -> &'static str {
        "retention_by_segment"
    }

    fn title(&self) -> &'static str {
        "Retention by Frequency Segment"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let reference = ctx.dataset.max_datetime();
        let customers = summarize_customers(ctx.dataset.lines());
        let freq: Vec<f64> = customers.iter().map(|c| c.transactions() as f64).collect();

        // bucket -> (customers, churned, summed recency)
        let mut tiers: BTreeMap<usize, (u64, u64, i64)> = BTreeMap::new();
        if let Some(t) = Tertiles::from_values(&freq) {
            for c in &customers {
                let days = days_since(c, reference);
                let e = tiers.entry(t.bucket(c.transactions() as f64)).or_default();
                e.0 += 1;
                if days > ctx.config.churn_threshold_days {
                    e.1 += 1;
                }
                e.2 += days;
            }
        }

        let mut table = Table::with_columns(
            self.name(),
            &["frequency_segment", "customers", "churn_rate", "avg_days_since_purchase"],
        );
        for (bucket, (n, churned, days)) in tiers {
            table.push_row(vec![
                Value::Text(FREQUENCY_TIERS[bucket].into()),
                Value::Int(n as i64),
                Value::number(churned as f64 / n as f64),
                Value::number(days as f64 / n as f64),
            ]);
        }
        Ok(table)
    }
}

// ── Metrics ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionMetrics {
    /// Percent of customers with more than one transaction.
    pub repeat_rate_pct: f64,
    /// Mean transactions per customer per elapsed month. None when the
    /// dataset spans less than one whole day.
    pub avg_monthly_frequency: Option<f64>,
    /// Percent of customers idle longer than the churn threshold.
    pub churn_risk_pct: f64,
}

impl RetentionMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let reference = ctx.dataset.max_datetime();
        let customers = summarize_customers(ctx.dataset.lines());
        let n = customers.len() as f64;
        let repeat = customers.iter().filter(|c| c.transactions() > 1).count() as f64;
        let churned = customers
            .iter()
            .filter(|c| days_since(c, reference) > ctx.config.churn_threshold_days)
            .count() as f64;
        let mean_txns = customers.iter().map(|c| c.transactions() as f64).sum::<f64>() / n;
        let months = ctx.dataset.elapsed_months(ctx.config.days_per_month);

        Self {
            repeat_rate_pct: repeat / n * 100.0,
            avg_monthly_frequency: (months > 0.0).then(|| mean_txns / months),
            churn_risk_pct: churned / n * 100.0,
        }
    }
}
