//! Scalar KPI blocks for the dashboard header rows.
//!
//! RULE: Percentages are 0–100. A metric whose denominator is empty
//! is None, never NaN.

use crate::{
    anomaly::AnomalyMetrics,
    calendar::is_weekend,
    finance::FinancialMetrics,
    retention::RetentionMetrics,
    segmentation::summarize_customers,
    view::ViewContext,
};
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

fn pct(numerator: f64, denominator: f64) -> Option<f64> {
    ratio(numerator, denominator).map(|r| r * 100.0)
}

// ── Key ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub total_sales: f64,
    pub transactions: usize,
    pub avg_transaction_value: Option<f64>,
    pub customers: usize,
}

impl KeyMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let total_sales = ctx.dataset.total_sales();
        let transactions = ctx.dataset.distinct_transactions();
        Self {
            total_sales,
            transactions,
            avg_transaction_value: ratio(total_sales, transactions as f64),
            customers: ctx.dataset.distinct_customers(),
        }
    }
}

// ── Customer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerMetrics {
    /// Share of lines bought by loyalty members.
    pub loyalty_line_pct: f64,
    pub avg_transactions_per_customer: f64,
    pub avg_spend_per_customer: f64,
}

impl CustomerMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let lines = ctx.dataset.lines();
        let loyal = lines.iter().filter(|l| l.loyalty_member).count() as f64;
        let customers = summarize_customers(lines);
        let n = customers.len() as f64;
        Self {
            loyalty_line_pct: loyal / lines.len() as f64 * 100.0,
            avg_transactions_per_customer: customers
                .iter()
                .map(|c| c.transactions() as f64)
                .sum::<f64>()
                / n,
            avg_spend_per_customer: customers.iter().map(|c| c.total_spend).sum::<f64>() / n,
        }
    }
}

// ── Inventory ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryMetrics {
    /// Units sold per whole day of the dataset span.
    pub avg_daily_volume: Option<f64>,
    /// Mean units sold per category.
    pub avg_category_turnover: f64,
    /// Percent of products selling under the slow-moving threshold.
    pub slow_moving_pct: Option<f64>,
}

impl InventoryMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let lines = ctx.dataset.lines();
        let days = ctx.dataset.span_days() as f64;
        let mut by_category: HashMap<&str, f64> = HashMap::new();
        let mut by_product: HashMap<&str, f64> = HashMap::new();
        let mut units = 0.0;
        for line in lines {
            let q = line.quantity as f64;
            units += q;
            *by_category.entry(line.product_category.as_str()).or_default() += q;
            *by_product.entry(line.product_id.as_str()).or_default() += q;
        }

        let slow = by_product
            .values()
            .filter(|q| **q / days < ctx.config.slow_moving_units_per_day)
            .count() as f64;

        Self {
            avg_daily_volume: ratio(units, days),
            avg_category_turnover: by_category.values().sum::<f64>() / by_category.len() as f64,
            slow_moving_pct: (days > 0.0).then(|| slow / by_product.len() as f64 * 100.0),
        }
    }
}

// ── Operational ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationalMetrics {
    /// Hour of day with the most distinct transactions; earliest on ties.
    pub peak_hour: u32,
    /// Mean seconds between consecutive transactions at the same store.
    pub avg_seconds_between_transactions: Option<f64>,
    /// Weekend sales as a percentage of weekday sales.
    pub weekend_sales_ratio_pct: Option<f64>,
}

impl OperationalMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let lines = ctx.dataset.lines();

        let mut hourly: BTreeMap<u32, HashSet<&str>> = BTreeMap::new();
        let mut store_txns: HashMap<&str, HashMap<&str, NaiveDateTime>> = HashMap::new();
        let (mut weekend, mut weekday) = (0.0, 0.0);
        for line in lines {
            let ts = line.transaction_datetime;
            hourly
                .entry(ts.hour())
                .or_default()
                .insert(line.transaction_id.as_str());
            store_txns
                .entry(line.store_location.as_str())
                .or_default()
                .insert(line.transaction_id.as_str(), ts);
            if is_weekend(ts.date()) {
                weekend += line.total_price;
            } else {
                weekday += line.total_price;
            }
        }

        let peak_hour = hourly
            .iter()
            .fold((0u32, 0usize), |best, (hour, txns)| {
                if txns.len() > best.1 {
                    (*hour, txns.len())
                } else {
                    best
                }
            })
            .0;

        let (mut gap_sum, mut gap_count) = (0.0, 0u64);
        for txns in store_txns.values() {
            let mut times: Vec<NaiveDateTime> = txns.values().copied().collect();
            times.sort();
            for w in times.windows(2) {
                gap_sum += (w[1] - w[0]).num_seconds() as f64;
                gap_count += 1;
            }
        }

        Self {
            peak_hour,
            avg_seconds_between_transactions: ratio(gap_sum, gap_count as f64),
            weekend_sales_ratio_pct: pct(weekend, weekday),
        }
    }
}

// ── Marketing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketingMetrics {
    /// Mean nonzero discount, as a percentage.
    pub avg_discount_pct: Option<f64>,
    /// Share of sales from discounted lines.
    pub promo_sales_pct: Option<f64>,
    /// Mean line value of discounted transactions relative to
    /// undiscounted ones, minus one, as a percentage.
    pub promo_basket_lift_pct: Option<f64>,
}

impl MarketingMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let lines = ctx.dataset.lines();
        let mut discount_sum = 0.0;
        let mut discounted_lines = 0u64;
        let mut promo_sales = 0.0;
        // transaction -> (discounted, line total sum, line count)
        let mut baskets: HashMap<&str, (bool, f64, u64)> = HashMap::new();
        for line in lines {
            let discounted = line.discount_applied > 0.0;
            if discounted {
                discount_sum += line.discount_applied;
                discounted_lines += 1;
                promo_sales += line.total_price;
            }
            let b = baskets
                .entry(line.transaction_id.as_str())
                .or_insert((discounted, 0.0, 0));
            b.1 += line.total_price;
            b.2 += 1;
        }

        let mean_of = |promo: bool| {
            let means: Vec<f64> = baskets
                .values()
                .filter(|b| b.0 == promo)
                .map(|b| b.1 / b.2 as f64)
                .collect();
            ratio(means.iter().sum(), means.len() as f64)
        };
        let lift = match (mean_of(true), mean_of(false)) {
            (Some(p), Some(r)) => ratio(p, r).map(|x| (x - 1.0) * 100.0),
            _ => None,
        };

        Self {
            avg_discount_pct: pct(discount_sum, discounted_lines as f64),
            promo_sales_pct: pct(promo_sales, ctx.dataset.total_sales()),
            promo_basket_lift_pct: lift,
        }
    }
}

// ── Geographic ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographicMetrics {
    pub urban_avg_line_value: Option<f64>,
    pub suburban_avg_line_value: Option<f64>,
    pub urban_loyalty_pct: Option<f64>,
    /// Share of lines sold at urban stores.
    pub urban_line_pct: f64,
}

impl GeographicMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        #[derive(Default)]
        struct Bucket {
            sales: f64,
            lines: u64,
            loyal: u64,
        }

        let mut buckets: HashMap<&str, Bucket> = HashMap::new();
        for line in ctx.dataset.lines() {
            let b = buckets
                .entry(ctx.config.location_type(&line.store_location))
                .or_default();
            b.sales += line.total_price;
            b.lines += 1;
            if line.loyalty_member {
                b.loyal += 1;
            }
        }

        let avg = |kind: &str| buckets.get(kind).and_then(|b| ratio(b.sales, b.lines as f64));
        let urban = buckets.get("Urban");
        Self {
            urban_avg_line_value: avg("Urban"),
            suburban_avg_line_value: avg("Suburban"),
            urban_loyalty_pct: urban.and_then(|b| pct(b.loyal as f64, b.lines as f64)),
            urban_line_pct: urban.map(|b| b.lines).unwrap_or(0) as f64
                / ctx.dataset.len() as f64
                * 100.0,
        }
    }
}

// ── Dashboard ───────────────────────────────────────────────────────────────

/// Every metric block, computed in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub key: KeyMetrics,
    pub customer: CustomerMetrics,
    pub inventory: InventoryMetrics,
    pub operational: OperationalMetrics,
    pub marketing: MarketingMetrics,
    pub anomaly: AnomalyMetrics,
    pub retention: RetentionMetrics,
    pub geographic: GeographicMetrics,
    pub financial: FinancialMetrics,
}

impl DashboardMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        log::debug!("metrics: computing dashboard blocks over {} lines", ctx.dataset.len());
        Self {
            key: KeyMetrics::compute(ctx),
            customer: CustomerMetrics::compute(ctx),
            inventory: InventoryMetrics::compute(ctx),
            operational: OperationalMetrics::compute(ctx),
            marketing: MarketingMetrics::compute(ctx),
            anomaly: AnomalyMetrics::compute(ctx),
            retention: RetentionMetrics::compute(ctx),
            geographic: GeographicMetrics::compute(ctx),
            financial: FinancialMetrics::compute(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::testing::small_dataset;

    #[test]
    fn key_metrics_over_small_dataset() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = KeyMetrics::compute(&ViewContext::new(&data, &config));
        assert!((m.total_sales - 44.75).abs() < 1e-9);
        assert_eq!(m.transactions, 4);
        assert_eq!(m.customers, 3);
        assert!((m.avg_transaction_value.unwrap() - 44.75 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn operational_peak_and_gaps() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = OperationalMetrics::compute(&ViewContext::new(&data, &config));
        // Hours 9, 15, 11, 18 each carry one transaction.
        assert_eq!(m.peak_hour, 9);
        // Only Downtown has two transactions: t1 and t3.
        let gap = (data.lines()[3].transaction_datetime - data.lines()[0].transaction_datetime)
            .num_seconds() as f64;
        assert_eq!(m.avg_seconds_between_transactions, Some(gap));
        // No weekend sales at all.
        assert_eq!(m.weekend_sales_ratio_pct, Some(0.0));
    }

    #[test]
    fn marketing_discount_stats() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = MarketingMetrics::compute(&ViewContext::new(&data, &config));
        assert!((m.avg_discount_pct.unwrap() - 7.5).abs() < 1e-9);
        assert!((m.promo_sales_pct.unwrap() - 22.75 / 44.75 * 100.0).abs() < 1e-9);
        // Promo line means 18.00 and 4.75; regular 6.50 and 9.00.
        let expected = ((18.0 + 4.75) / 2.0) / ((6.5 + 9.0) / 2.0) - 1.0;
        assert!((m.promo_basket_lift_pct.unwrap() - expected * 100.0).abs() < 1e-9);
    }

    #[test]
    fn geographic_splits_by_location_type() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = GeographicMetrics::compute(&ViewContext::new(&data, &config));
        assert!((m.urban_avg_line_value.unwrap() - 22.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.suburban_avg_line_value, Some(18.0));
        assert_eq!(m.urban_loyalty_pct, Some(0.0));
        assert!((m.urban_line_pct - 60.0).abs() < 1e-9);
    }

    #[test]
    fn inventory_rates_use_whole_day_span() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = InventoryMetrics::compute(&ViewContext::new(&data, &config));
        assert!((m.avg_daily_volume.unwrap() - 11.0 / 99.0).abs() < 1e-12);
        assert_eq!(m.avg_category_turnover, 5.5);
        assert_eq!(m.slow_moving_pct, Some(100.0));
    }

    #[test]
    fn dashboard_serializes_every_block() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let m = DashboardMetrics::compute(&ViewContext::new(&data, &config));
        let json = serde_json::to_value(&m).unwrap();
        for block in ["key", "customer", "inventory", "operational", "marketing", "anomaly", "retention", "geographic", "financial"] {
            assert!(json.get(block).is_some(), "missing block {block}");
        }
    }
}
