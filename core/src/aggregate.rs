//! Declarative group-by engine behind most report views.
//!
//! RULE: A ViewSpec is data, not code.
//! Group keys, aggregations, derived columns, sort and limit are
//! declared once; `evaluate` is the only place that walks the lines.
//! Groups come out in key order (BTreeMap) before any sort is applied,
//! so every view is deterministic for a given dataset.

use crate::{
    calendar::{month_day, season, weekday_name},
    config::ReportConfig,
    dataset::TransactionLine,
    error::GroceryResult,
    finance::line_margin,
    table::{Table, Value},
    types::rate_to_bps,
    view::{ReportView, ViewContext},
};
use chrono::{Datelike, NaiveDate, Timelike};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

// ── Keys ────────────────────────────────────────────────────────────────────

/// One component of a group key. Ordering is the output order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Bool(bool),
    Int(i64),
    /// Discount rate in basis points; rendered back as a fraction.
    Rate(i64),
    Date(NaiveDate),
    /// Sorted by rank, rendered as the label (weekdays, seasons).
    Ranked(u32, &'static str),
    Text(String),
}

impl Key {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(v) => Value::Int(*v),
            Self::Rate(bps) => Value::Number(*bps as f64 / 10_000.0),
            Self::Date(d) => Value::Date(*d),
            Self::Ranked(_, label) => Value::Text(label.to_string()),
            Self::Text(s) => Value::Text(s.clone()),
        }
    }
}

/// A line attribute usable as a group key or a distinct-count target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Date,
    Hour,
    Weekday,
    Month,
    Season,
    /// ISO week number of the timestamp.
    Week,
    Transaction,
    Customer,
    Product,
    ProductName,
    Category,
    StoreLocation,
    LocationType,
    PaymentMethod,
    Loyalty,
    Discount,
    /// `MM-DD` when the date is a configured holiday day, else "Regular".
    Holiday,
    Weekend,
}

impl Dimension {
    pub fn key(&self, line: &TransactionLine, config: &ReportConfig) -> Key {
        let ts = line.transaction_datetime;
        match self {
            Self::Date => Key::Date(ts.date()),
            Self::Hour => Key::Int(ts.hour() as i64),
            Self::Weekday => {
                let wd = ts.weekday();
                Key::Ranked(wd.num_days_from_monday(), weekday_name(wd))
            }
            Self::Month => Key::Int(ts.month() as i64),
            Self::Season => Key::Ranked((ts.month() - 1) / 3, season(ts.month())),
            Self::Week => Key::Int(ts.iso_week().week() as i64),
            Self::Transaction => Key::Text(line.transaction_id.clone()),
            Self::Customer => Key::Text(line.customer_id.clone()),
            Self::Product => Key::Text(line.product_id.clone()),
            Self::ProductName => Key::Text(line.product_name.clone()),
            Self::Category => Key::Text(line.product_category.clone()),
            Self::StoreLocation => Key::Text(line.store_location.clone()),
            Self::LocationType => Key::Text(config.location_type(&line.store_location).to_string()),
            Self::PaymentMethod => Key::Text(line.payment_method.clone()),
            Self::Loyalty => Key::Bool(line.loyalty_member),
            Self::Discount => Key::Rate(rate_to_bps(line.discount_applied)),
            Self::Holiday => {
                let md = month_day(ts.date());
                if config.holiday_days.contains(&md) {
                    Key::Text(md)
                } else {
                    Key::Text("Regular".into())
                }
            }
            Self::Weekend => Key::Bool(crate::calendar::is_weekend(ts.date())),
        }
    }
}

// ── Measures and aggregations ───────────────────────────────────────────────

/// A numeric line attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Quantity,
    UnitPrice,
    TotalPrice,
    Margin,
    /// 1.0 for loyalty members, so its mean is the loyalty rate.
    Loyalty,
    Discount,
}

impl Measure {
    pub fn value(&self, line: &TransactionLine, config: &ReportConfig) -> f64 {
        match self {
            Self::Quantity => line.quantity as f64,
            Self::UnitPrice => line.unit_price,
            Self::TotalPrice => line.total_price,
            Self::Margin => line_margin(line, config),
            Self::Loyalty => {
                if line.loyalty_member {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Discount => line.discount_applied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum(Measure),
    Mean(Measure),
    /// Sample standard deviation; Missing for groups of one line.
    Std(Measure),
    Min(Measure),
    Max(Measure),
    /// Number of lines in the group.
    Count,
    Distinct(Dimension),
}

/// Running state for one aggregation in one group.
enum Acc {
    Sum(f64),
    Mean { sum: f64, n: u64 },
    Std(Welford),
    Min(f64),
    Max(f64),
    Count(u64),
    Distinct(HashSet<Key>),
}

/// Single-pass mean and variance.
#[derive(Default)]
pub(crate) struct Welford {
    n: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub(crate) fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }

    pub(crate) fn sample_std(&self) -> Option<f64> {
        (self.n >= 2).then(|| (self.m2 / (self.n - 1) as f64).sqrt())
    }
}

impl Acc {
    fn new(agg: &Agg) -> Self {
        match agg {
            Agg::Sum(_) => Self::Sum(0.0),
            Agg::Mean(_) => Self::Mean { sum: 0.0, n: 0 },
            Agg::Std(_) => Self::Std(Welford::default()),
            Agg::Min(_) => Self::Min(f64::INFINITY),
            Agg::Max(_) => Self::Max(f64::NEG_INFINITY),
            Agg::Count => Self::Count(0),
            Agg::Distinct(_) => Self::Distinct(HashSet::new()),
        }
    }

    fn update(&mut self, agg: &Agg, line: &TransactionLine, config: &ReportConfig) {
        match (self, agg) {
            (Self::Sum(s), Agg::Sum(m)) => *s += m.value(line, config),
            (Self::Mean { sum, n }, Agg::Mean(m)) => {
                *sum += m.value(line, config);
                *n += 1;
            }
            (Self::Std(w), Agg::Std(m)) => w.push(m.value(line, config)),
            (Self::Min(v), Agg::Min(m)) => *v = v.min(m.value(line, config)),
            (Self::Max(v), Agg::Max(m)) => *v = v.max(m.value(line, config)),
            (Self::Count(n), Agg::Count) => *n += 1,
            (Self::Distinct(set), Agg::Distinct(d)) => {
                set.insert(d.key(line, config));
            }
            _ => {}
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Sum(s) => Value::number(s),
            Self::Mean { sum, n } => Value::number(sum / n as f64),
            Self::Std(w) => w.sample_std().map(Value::number).unwrap_or(Value::Missing),
            Self::Min(v) | Self::Max(v) => Value::number(v),
            Self::Count(n) => Value::Int(n as i64),
            Self::Distinct(set) => Value::Int(set.len() as i64),
        }
    }
}

// ── Derived columns ─────────────────────────────────────────────────────────

/// A column computed from earlier columns once all groups are final.
/// Derived columns see the aggregation columns and every derived column
/// declared before them.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    /// numerator / denominator × scale; Missing on a zero denominator.
    Ratio {
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
        scale: f64,
    },
    /// column × factor.
    Scale {
        name: &'static str,
        column: &'static str,
        factor: f64,
    },
    /// Share of `column` within the groups sharing the first `within`
    /// key components. `within = 0` means share of the grand total.
    Share {
        name: &'static str,
        column: &'static str,
        within: usize,
    },
    /// column / whole days spanned by the dataset × scale.
    PerDay {
        name: &'static str,
        column: &'static str,
        scale: f64,
    },
    /// Trailing mean over `window` rows in key order; Missing for the
    /// first window − 1 rows.
    Rolling {
        name: &'static str,
        column: &'static str,
        window: usize,
    },
}

impl Derived {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ratio { name, .. }
            | Self::Scale { name, .. }
            | Self::Share { name, .. }
            | Self::PerDay { name, .. }
            | Self::Rolling { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

// ── ViewSpec ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub keys: Vec<(&'static str, Dimension)>,
    pub aggs: Vec<(&'static str, Agg)>,
    pub derived: Vec<Derived>,
    pub sort: Option<(&'static str, Order)>,
    pub limit: Option<usize>,
}

impl ViewSpec {
    pub fn new(name: &'static str, title: &'static str) -> Self {
        Self {
            name,
            title,
            keys: Vec::new(),
            aggs: Vec::new(),
            derived: Vec::new(),
            sort: None,
            limit: None,
        }
    }

    pub fn key(mut self, column: &'static str, dim: Dimension) -> Self {
        self.keys.push((column, dim));
        self
    }

    pub fn agg(mut self, column: &'static str, agg: Agg) -> Self {
        self.aggs.push((column, agg));
        self
    }

    pub fn derive(mut self, derived: Derived) -> Self {
        self.derived.push(derived);
        self
    }

    pub fn ratio(self, name: &'static str, numerator: &'static str, denominator: &'static str) -> Self {
        self.derive(Derived::Ratio { name, numerator, denominator, scale: 1.0 })
    }

    pub fn share(self, name: &'static str, column: &'static str, within: usize) -> Self {
        self.derive(Derived::Share { name, column, within })
    }

    pub fn sort_by(mut self, column: &'static str, order: Order) -> Self {
        self.sort = Some((column, order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn columns(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|(c, _)| *c)
            .chain(self.aggs.iter().map(|(c, _)| *c))
            .chain(self.derived.iter().map(Derived::name))
            .map(str::to_string)
            .collect()
    }

    pub fn evaluate(&self, ctx: &ViewContext<'_>) -> Table {
        let mut groups: BTreeMap<Vec<Key>, Vec<Acc>> = BTreeMap::new();
        for line in ctx.dataset.lines() {
            let key: Vec<Key> = self.keys.iter().map(|(_, d)| d.key(line, ctx.config)).collect();
            let accs = groups
                .entry(key)
                .or_insert_with(|| self.aggs.iter().map(|(_, a)| Acc::new(a)).collect());
            for (acc, (_, agg)) in accs.iter_mut().zip(&self.aggs) {
                acc.update(agg, line, ctx.config);
            }
        }

        let mut columns: Vec<String> = self
            .keys
            .iter()
            .map(|(c, _)| *c)
            .chain(self.aggs.iter().map(|(c, _)| *c))
            .map(str::to_string)
            .collect();
        let mut keys = Vec::with_capacity(groups.len());
        let mut rows = Vec::with_capacity(groups.len());
        for (key, accs) in groups {
            let row: Vec<Value> = key
                .iter()
                .map(Key::to_value)
                .chain(accs.into_iter().map(Acc::finish))
                .collect();
            keys.push(key);
            rows.push(row);
        }

        for derived in &self.derived {
            let values = derive_column(derived, &columns, &keys, &rows, ctx);
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
            columns.push(derived.name().to_string());
        }

        if let Some((column, order)) = self.sort {
            if let Some(col) = columns.iter().position(|c| c == column) {
                rows.sort_by(|a, b| compare_values(&a[col], &b[col], order));
            }
        }
        if let Some(n) = self.limit {
            rows.truncate(n);
        }

        log::debug!("aggregate: {} -> {} rows", self.name, rows.len());
        let mut table = Table::new(self.name, columns);
        table.rows = rows;
        table
    }
}

impl ReportView for ViewSpec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn title(&self) -> &'static str {
        self.title
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        Ok(self.evaluate(ctx))
    }
}

fn derive_column(
    derived: &Derived,
    columns: &[String],
    keys: &[Vec<Key>],
    rows: &[Vec<Value>],
    ctx: &ViewContext<'_>,
) -> Vec<Value> {
    let cell = |row: &Vec<Value>, column: &str| -> Option<f64> {
        columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| row[i].as_f64())
    };

    match derived {
        Derived::Ratio { numerator, denominator, scale, .. } => rows
            .iter()
            .map(|r| match (cell(r, *numerator), cell(r, *denominator)) {
                (Some(n), Some(d)) if d != 0.0 => Value::number(n / d * scale),
                _ => Value::Missing,
            })
            .collect(),
        Derived::Scale { column, factor, .. } => rows
            .iter()
            .map(|r| cell(r, *column).map(|v| Value::number(v * factor)).unwrap_or(Value::Missing))
            .collect(),
        Derived::Share { column, within, .. } => {
            let mut totals: BTreeMap<&[Key], f64> = BTreeMap::new();
            for (key, row) in keys.iter().zip(rows) {
                let prefix = &key[..(*within).min(key.len())];
                *totals.entry(prefix).or_default() += cell(row, *column).unwrap_or(0.0);
            }
            keys.iter()
                .zip(rows)
                .map(|(key, row)| {
                    let prefix = &key[..(*within).min(key.len())];
                    let total = totals.get(prefix).copied().unwrap_or(0.0);
                    match cell(row, *column) {
                        Some(v) if total != 0.0 => Value::number(v / total),
                        _ => Value::Missing,
                    }
                })
                .collect()
        }
        Derived::PerDay { column, scale, .. } => {
            let days = ctx.dataset.span_days() as f64;
            rows.iter()
                .map(|r| match cell(r, *column) {
                    Some(v) if days > 0.0 => Value::number(v / days * scale),
                    _ => Value::Missing,
                })
                .collect()
        }
        Derived::Rolling { column, window, .. } => {
            let series: Vec<Option<f64>> = rows.iter().map(|r| cell(r, *column)).collect();
            (0..series.len())
                .map(|i| {
                    if *window == 0 || i + 1 < *window {
                        return Value::Missing;
                    }
                    let slice = &series[i + 1 - window..=i];
                    slice
                        .iter()
                        .copied()
                        .sum::<Option<f64>>()
                        .map(|s| Value::number(s / *window as f64))
                        .unwrap_or(Value::Missing)
                })
                .collect()
        }
    }
}

/// Numbers compare numerically, everything else by its rendered text.
/// Missing always sorts last.
fn compare_values(a: &Value, b: &Value, order: Order) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    let ord = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    };
    match order {
        Order::Ascending => ord,
        Order::Descending => ord.reverse(),
    }
}
