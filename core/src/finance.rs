//! Margin model: modeled unit cost from the category margin table.
//!
//! RULE: unit_cost = unit_price × (1 − margin); the line margin is the
//! discounted revenue minus the full modeled cost of the units sold.

use crate::{config::ReportConfig, dataset::TransactionLine, view::ViewContext};
use serde::Serialize;
use std::collections::BTreeMap;

pub fn unit_cost(line: &TransactionLine, config: &ReportConfig) -> f64 {
    line.unit_price * (1.0 - config.margin_for(&line.product_category))
}

/// Revenue minus modeled cost for one line. Negative when the discount
/// exceeds the category margin.
pub fn line_margin(line: &TransactionLine, config: &ReportConfig) -> f64 {
    line.total_price - unit_cost(line, config) * line.quantity as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialMetrics {
    /// Margin as a percentage of revenue over all lines.
    pub overall_margin_pct: Option<f64>,
    /// Margin percentage restricted to discounted lines.
    pub discounted_margin_pct: Option<f64>,
    pub highest_margin_category: Option<String>,
    pub highest_margin_pct: Option<f64>,
}

#[derive(Default)]
struct MarginSum {
    margin: f64,
    revenue: f64,
}

impl MarginSum {
    fn add(&mut self, line: &TransactionLine, config: &ReportConfig) {
        self.margin += line_margin(line, config);
        self.revenue += line.total_price;
    }

    fn pct(&self) -> Option<f64> {
        (self.revenue != 0.0).then(|| self.margin / self.revenue * 100.0)
    }
}

impl FinancialMetrics {
    pub fn compute(ctx: &ViewContext<'_>) -> Self {
        let mut overall = MarginSum::default();
        let mut discounted = MarginSum::default();
        let mut by_category: BTreeMap<&str, MarginSum> = BTreeMap::new();

        for line in ctx.dataset.lines() {
            overall.add(line, ctx.config);
            if line.discount_applied > 0.0 {
                discounted.add(line, ctx.config);
            }
            by_category
                .entry(line.product_category.as_str())
                .or_default()
                .add(line, ctx.config);
        }

        // Ties resolve to the alphabetically first category.
        let best = by_category
            .iter()
            .filter_map(|(cat, sum)| sum.pct().map(|p| (*cat, p)))
            .fold(None, |best: Option<(&str, f64)>, (cat, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((cat, p)),
            });

        Self {
            overall_margin_pct: overall.pct(),
            discounted_margin_pct: discounted.pct(),
            highest_margin_category: best.map(|(c, _)| c.to_string()),
            highest_margin_pct: best.map(|(_, p)| p),
        }
    }
}
