//! Per-customer summaries and tertile segmentation.
//!
//! RULE: Tertile edges are the 1/3 and 2/3 linear-interpolation
//! quantiles of the population. A value gets label i when it is at or
//! below edge i; values above the last edge get the top label. Equal
//! edges leave the middle label unused.

use crate::{
    dataset::TransactionLine,
    error::GroceryResult,
    table::{Table, Value},
    view::{ReportView, ViewContext},
};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

pub const FREQUENCY_LABELS: [&str; 3] = ["Occasional", "Regular", "Frequent"];
pub const SPEND_LABELS: [&str; 3] = ["Low Spender", "Medium Spender", "High Spender"];

/// Everything the customer-level views need about one customer.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSummary {
    pub customer_id: String,
    pub loyalty_member: bool,
    pub total_spend: f64,
    /// Distinct transaction timestamps, ascending. One entry per
    /// transaction id even when two share a second.
    pub purchases: Vec<NaiveDateTime>,
}

impl CustomerSummary {
    pub fn transactions(&self) -> usize {
        self.purchases.len()
    }

    pub fn last_purchase(&self) -> Option<NaiveDateTime> {
        self.purchases.last().copied()
    }

    /// Whole days between consecutive purchases.
    pub fn gaps_in_days(&self) -> Vec<i64> {
        self.purchases
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .collect()
    }
}

/// Summaries ordered by customer id.
pub fn summarize_customers(lines: &[TransactionLine]) -> Vec<CustomerSummary> {
    struct Builder<'a> {
        loyalty: bool,
        spend: f64,
        txns: BTreeSet<(NaiveDateTime, &'a str)>,
    }

    let mut by_customer: BTreeMap<&str, Builder<'_>> = BTreeMap::new();
    for line in lines {
        let b = by_customer
            .entry(line.customer_id.as_str())
            .or_insert_with(|| Builder {
                loyalty: line.loyalty_member,
                spend: 0.0,
                txns: BTreeSet::new(),
            });
        b.spend += line.total_price;
        b.txns
            .insert((line.transaction_datetime, line.transaction_id.as_str()));
    }

    by_customer
        .into_iter()
        .map(|(id, b)| CustomerSummary {
            customer_id: id.to_string(),
            loyalty_member: b.loyalty,
            total_spend: b.spend,
            purchases: b.txns.into_iter().map(|(ts, _)| ts).collect(),
        })
        .collect()
}

// ── Quantiles ───────────────────────────────────────────────────────────────

/// Linear-interpolation quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile(&sorted, 0.5)
}

/// Tertile classifier built from a population of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tertiles {
    pub lower: f64,
    pub upper: f64,
}

impl Tertiles {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            lower: quantile(&sorted, 1.0 / 3.0)?,
            upper: quantile(&sorted, 2.0 / 3.0)?,
        })
    }

    pub fn bucket(&self, value: f64) -> usize {
        if value <= self.lower {
            0
        } else if value <= self.upper {
            1
        } else {
            2
        }
    }

    pub fn label(&self, value: f64, labels: &[&'static str; 3]) -> &'static str {
        labels[self.bucket(value)]
    }
}

// ── View ────────────────────────────────────────────────────────────────────

/// Frequency and spend tertiles with a simple annual value projection.
pub struct CustomerSegmentation;

impl ReportView for CustomerSegmentation {
    fn name(&self) -> &'static str {
        "customer_segments"
    }

    fn title(&self) -> &'static str {
        "Customer Segmentation"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let customers = summarize_customers(ctx.dataset.lines());
        let freq: Vec<f64> = customers.iter().map(|c| c.transactions() as f64).collect();
        let spend: Vec<f64> = customers.iter().map(|c| c.total_spend).collect();
        let freq_t = Tertiles::from_values(&freq);
        let spend_t = Tertiles::from_values(&spend);
        let months = ctx.dataset.elapsed_months(ctx.config.days_per_month);

        let mut table = Table::with_columns(
            self.name(),
            &[
                "customer_id",
                "transaction_count",
                "total_spend",
                "loyalty_member",
                "frequency_segment",
                "spend_segment",
                "projected_annual_value",
            ],
        );
        for c in &customers {
            let freq_label = freq_t.map(|t| t.label(c.transactions() as f64, &FREQUENCY_LABELS));
            let spend_label = spend_t.map(|t| t.label(c.total_spend, &SPEND_LABELS));
            let projected = if months > 0.0 {
                Value::number(c.total_spend / months * 12.0)
            } else {
                Value::Missing
            };
            table.push_row(vec![
                Value::Text(c.customer_id.clone()),
                Value::Int(c.transactions() as i64),
                Value::number(c.total_spend),
                Value::Bool(c.loyalty_member),
                freq_label.map(|l| Value::Text(l.into())).unwrap_or(Value::Missing),
                spend_label.map(|l| Value::Text(l.into())).unwrap_or(Value::Missing),
                projected,
            ]);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::testing::small_dataset;

    #[test]
    fn quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
        assert!((quantile(&v, 1.0 / 3.0).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn tertile_labels_use_inclusive_upper_edges() {
        let t = Tertiles::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).unwrap();
        assert_eq!(t.label(1.0, &FREQUENCY_LABELS), "Occasional");
        assert_eq!(t.label(2.0, &FREQUENCY_LABELS), "Occasional");
        assert_eq!(t.label(4.0, &FREQUENCY_LABELS), "Regular");
        assert_eq!(t.label(7.0, &FREQUENCY_LABELS), "Frequent");
    }

    #[test]
    fn identical_values_share_the_lowest_label() {
        let t = Tertiles::from_values(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(t.bucket(2.0), 0);
    }

    #[test]
    fn summaries_count_distinct_transactions() {
        let data = small_dataset();
        let customers = summarize_customers(data.lines());
        let ids: Vec<_> = customers.iter().map(|c| c.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        // c1 bought in t1 (two lines) and t3.
        assert_eq!(customers[0].transactions(), 2);
        assert!((customers[0].total_spend - 22.0).abs() < 1e-9);
        assert_eq!(customers[0].gaps_in_days(), vec![98]);
        assert!(customers[1].loyalty_member);
    }

    #[test]
    fn segmentation_projects_annual_value() {
        let data = small_dataset();
        let config = ReportConfig::default();
        let t = CustomerSegmentation
            .compute(&ViewContext::new(&data, &config))
            .unwrap();
        assert_eq!(t.len(), 3);
        // Span is 99 whole days: 3.3 months.
        let months = 99.0 / 30.0;
        assert!((t.number(0, "projected_annual_value").unwrap() - 22.0 / months * 12.0).abs() < 1e-9);
        assert_eq!(t.text(0, "frequency_segment"), Some("Frequent"));
        assert_eq!(t.text(0, "spend_segment"), Some("High Spender"));
    }
}
