//! Per-line z-score anomaly scan against per-product statistics.
//!
//! RULE: A zero standard deviation is replaced by 1 before dividing.
//! Products seen on a single line have no sample deviation and are
//! treated the same way, so their z-scores are 0.

use crate::{
    aggregate::Welford,
    config::ReportConfig,
    dataset::TransactionLine,
    error::GroceryResult,
    table::{Table, Value},
    view::{ReportView, ViewContext},
};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductStats {
    pub quantity_mean: f64,
    pub quantity_std: f64,
    pub price_mean: f64,
    pub price_std: f64,
}

impl ProductStats {
    pub fn quantity_z(&self, line: &TransactionLine) -> f64 {
        (line.quantity as f64 - self.quantity_mean) / guard(self.quantity_std)
    }

    pub fn price_z(&self, line: &TransactionLine) -> f64 {
        (line.unit_price - self.price_mean) / guard(self.price_std)
    }
}

fn guard(std: f64) -> f64 {
    if std == 0.0 {
        1.0
    } else {
        std
    }
}

pub fn product_stats(lines: &[TransactionLine]) -> HashMap<&str, ProductStats> {
    let mut acc: HashMap<&str, (Welford, Welford)> = HashMap::new();
    for line in lines {
        let (q, p) = acc.entry(line.product_id.as_str()).or_default();
        q.push(line.quantity as f64);
        p.push(line.unit_price);
    }
    acc.into_iter()
        .map(|(id, (q, p))| {
            let stats = ProductStats {
                quantity_mean: q.mean(),
                quantity_std: q.sample_std().unwrap_or(0.0),
                price_mean: p.mean(),
                price_std: p.sample_std().unwrap_or(0.0),
            };
            (id, stats)
        })
        .collect()
}

/// Mean total_price per category.
pub fn category_mean_totals(lines: &[TransactionLine]) -> HashMap<&str, f64> {
    let mut acc: HashMap<&str, (f64, u64)> = HashMap::new();
    for line in lines {
        let e = acc.entry(line.product_category.as_str()).or_default();
        e.0 += line.total_price;
        e.1 += 1;
    }
    acc.into_iter().map(|(c, (s, n))| (c, s / n as f64)).collect()
}

/// One scored line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineScore {
    pub quantity_z: f64,
    pub price_z: f64,
    pub quantity_anomaly: bool,
    pub price_anomaly: bool,
    pub high_value: bool,
}

/// Scores every line in dataset order.
pub fn score_lines(lines: &[TransactionLine], config: &ReportConfig) -> Vec<LineScore> {
    let stats = product_stats(lines);
    let category_means = category_mean_totals(lines);
    lines
        .iter()
        .map(|line| {
            let s = stats[line.product_id.as_str()];
            let quantity_z = s.quantity_z(line);
            let price_z = s.price_z(line);
            let category_mean = category_means[line.product_category.as_str()];
            LineScore {
                quantity_z,
                price_z,
                quantity_anomaly: quantity_z.abs() > config.anomaly_z_threshold,
                price_anomaly: price_z.abs() > config.anomaly_z_threshold,
                high_value: line.total_price > config.high_value_multiplier * category_mean,
            }
        })
        .collect()
}

// ── Views ───────────────────────────────────────────────────────────────────

pub struct AnomalyScan;

impl ReportView for AnomalyScan {
    fn name(&self) -> &'static str {
        "anomaly_scan"
    }

    fn title(&self) -> &'static str {
        "Line Anomaly Scan"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let lines = ctx.dataset.lines();
        let scores = score_lines(lines, ctx.config);
        let mut table = Table::with_columns(
            self.name(),
            &[
                "transaction_id",
                "product_id",
                "product_category",
                "quantity",
                "unit_price",
                "total_price",
                "quantity_zscore",
                "price_zscore",
                "quantity_anomaly",
                "price_anomaly",
                "high_value",
            ],
        );
        for (line, s) in lines.iter().zip(&scores) {
            table.push_row(vec![
                Value::Text(line.transaction_id.clone()),
                Value::Text(line.product_id.clone()),
                Value::Text(line.product_category.clone()),
                Value::Int(line.quantity as i64),
                Value::number(line.unit_price),
                Value::number(line.total_price),
                Value::number(s.quantity_z),
                Value::number(s.price_z),
                Value::Bool(s.quantity_anomaly),
                Value::Bool(s.price_anomaly),
                Value::Bool(s.high_value),
            ]);
        }
        Ok(table)
    }
}

/// Percentages of lines flagged by each rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyMetrics {
    pub quantity_anomaly_pct: f64,
    pub price_anomaly_pct: f64,
    pub high_value_pct: f64,
}

impl AnomalyMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let scores = score_lines(ctx.dataset.lines(), ctx.config);
        let pct = |f: fn(&LineScore) -> bool| {
            scores.iter().filter(|s| f(s)).count() as f64 / scores.len() as f64 * 100.0
        };
        Self {
            quantity_anomaly_pct: pct(|s| s.quantity_anomaly),
            price_anomaly_pct: pct(|s| s.price_anomaly),
            high_value_pct: pct(|s| s.high_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::testing::line;

    fn ctx_metrics(data: &Dataset) -> (Table, AnomalyMetrics) {
        let config = ReportConfig::default();
        let ctx = ViewContext::new(data, &config);
        (AnomalyScan.compute(&ctx).unwrap(), AnomalyMetrics::compute(&ctx))
    }

    #[test]
    fn constant_quantity_scores_zero() {
        let lines = (0..5)
            .map(|i| line(&format!("t{i}"), "c", "2023-02-01 10:00:00", "P1", "Dairy", 4, 2.50, 0.0))
            .collect();
        let data = Dataset::new(lines).unwrap();
        let (t, m) = ctx_metrics(&data);
        assert!(t.numbers("quantity_zscore").iter().all(|z| *z == 0.0));
        assert!(t.numbers("price_zscore").iter().all(|z| *z == 0.0));
        assert_eq!(m.quantity_anomaly_pct, 0.0);
    }

    #[test]
    fn single_line_product_is_not_anomalous() {
        let data = Dataset::new(vec![line("t", "c", "2023-02-01 10:00:00", "P1", "Dairy", 90, 2.50, 0.0)])
            .unwrap();
        let (t, _) = ctx_metrics(&data);
        assert_eq!(t.number(0, "quantity_zscore"), Some(0.0));
    }

    #[test]
    fn bulk_outlier_is_flagged() {
        let mut lines: Vec<_> = (0..30)
            .map(|i| {
                let q = 1 + (i % 3) as u32;
                line(&format!("t{i}"), "c", "2023-02-01 10:00:00", "P1", "Dairy", q, 2.00, 0.0)
            })
            .collect();
        lines.push(line("tx", "c", "2023-02-01 10:00:00", "P1", "Dairy", 80, 2.00, 0.0));
        let data = Dataset::new(lines).unwrap();
        let (t, m) = ctx_metrics(&data);
        let outlier = t.find_row("transaction_id", &Value::Text("tx".into())).unwrap();
        assert_eq!(t.value(outlier, "quantity_anomaly"), Some(&Value::Bool(true)));
        assert_eq!(t.value(outlier, "high_value"), Some(&Value::Bool(true)));
        assert!((m.quantity_anomaly_pct - 100.0 / 31.0).abs() < 1e-9);
        assert_eq!(t.value(0, "quantity_anomaly"), Some(&Value::Bool(false)));
    }
}
