//! The flattened transaction-line table.
//!
//! RULE: A Dataset is built once (by the generator or the loader)
//! and never mutated afterwards. Every report view borrows it.

use crate::{
    error::{GroceryError, GroceryResult},
    types::{round_cents, CustomerId, DiscountRate, ProductId, TransactionId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column names of the persisted shard format, in file order.
pub const COLUMNS: [&str; 13] = [
    "transaction_id",
    "customer_id",
    "transaction_datetime",
    "store_location",
    "product_id",
    "product_name",
    "product_category",
    "quantity",
    "unit_price",
    "total_price",
    "payment_method",
    "loyalty_member",
    "discount_applied",
];

/// One (transaction, product) pairing, the unit of persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionLine {
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    #[serde(with = "datetime_format")]
    pub transaction_datetime: NaiveDateTime,
    pub store_location: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_category: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub payment_method: String,
    pub loyalty_member: bool,
    pub discount_applied: DiscountRate,
}

impl TransactionLine {
    /// round2(quantity × unit_price × (1 − discount)).
    pub fn expected_total(quantity: u32, unit_price: f64, discount: DiscountRate) -> f64 {
        round_cents(quantity as f64 * unit_price * (1.0 - discount))
    }

    /// Recompute the cached total from the line's own fields.
    pub fn recomputed_total(&self) -> f64 {
        Self::expected_total(self.quantity, self.unit_price, self.discount_applied)
    }
}

/// Timestamps are written as `YYYY-MM-DD HH:MM:SS`; reading also
/// accepts a `T` separator and fractional seconds.
pub mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn format(ts: &NaiveDateTime) -> String {
        ts.format(FORMAT).to_string()
    }

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

/// Accepts `true`/`false` in any case plus `1`/`0`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// The immutable, fully loaded line table.
#[derive(Debug, Clone)]
pub struct Dataset {
    lines: Vec<TransactionLine>,
    min_ts: NaiveDateTime,
    max_ts: NaiveDateTime,
}

impl Dataset {
    pub fn new(lines: Vec<TransactionLine>) -> GroceryResult<Self> {
        let first = lines.first().ok_or(GroceryError::EmptyDataset)?;
        let (mut min_ts, mut max_ts) = (first.transaction_datetime, first.transaction_datetime);
        for line in &lines {
            min_ts = min_ts.min(line.transaction_datetime);
            max_ts = max_ts.max(line.transaction_datetime);
        }
        Ok(Self {
            lines,
            min_ts,
            max_ts,
        })
    }

    pub fn lines(&self) -> &[TransactionLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<TransactionLine> {
        self.lines
    }

    pub fn min_datetime(&self) -> NaiveDateTime {
        self.min_ts
    }

    pub fn max_datetime(&self) -> NaiveDateTime {
        self.max_ts
    }

    /// Whole days between the earliest and latest timestamp.
    pub fn span_days(&self) -> i64 {
        (self.max_ts - self.min_ts).num_days()
    }

    /// Elapsed months as whole days / days_per_month. Zero when the
    /// dataset spans less than one day.
    pub fn elapsed_months(&self, days_per_month: f64) -> f64 {
        self.span_days() as f64 / days_per_month
    }

    pub fn distinct_transactions(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.transaction_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn distinct_customers(&self) -> usize {
        self.lines
            .iter()
            .map(|l| l.customer_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn total_sales(&self) -> f64 {
        self.lines.iter().map(|l| l.total_price).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_parse_in_both_layouts() {
        let a = datetime_format::parse("2023-05-01 13:22:11").unwrap();
        let b = datetime_format::parse("2023-05-01T13:22:11").unwrap();
        let c = datetime_format::parse("2023-05-01 13:22:11.000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(datetime_format::format(&a), "2023-05-01 13:22:11");
        assert!(datetime_format::parse("05/01/2023").is_none());
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("yes"), None);
    }

    #[test]
    fn expected_total_applies_discount_then_rounds() {
        assert_eq!(TransactionLine::expected_total(3, 2.99, 0.10), 8.07);
        assert_eq!(TransactionLine::expected_total(1, 4.50, 0.0), 4.50);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        assert!(matches!(Dataset::new(vec![]), Err(GroceryError::EmptyDataset)));
    }
}
