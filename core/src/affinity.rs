//! Category affinity: Pearson correlation of per-transaction quantities.
//!
//! Each transaction is a vector of summed quantities per category,
//! zero where the category is absent. A category with no variance
//! across transactions has an undefined correlation.

use crate::{
    error::GroceryResult,
    table::{Table, Value},
    view::{ReportView, ViewContext},
};
use std::collections::{BTreeMap, BTreeSet};

pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

pub struct CategoryAffinity;

impl ReportView for CategoryAffinity {
    fn name(&self) -> &'static str {
        "category_affinity"
    }

    fn title(&self) -> &'static str {
        "Category Affinity"
    }

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table> {
        let lines = ctx.dataset.lines();
        let categories: Vec<&str> = lines
            .iter()
            .map(|l| l.product_category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column_of: BTreeMap<&str, usize> =
            categories.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let mut baskets: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for line in lines {
            let basket = baskets
                .entry(line.transaction_id.as_str())
                .or_insert_with(|| vec![0.0; categories.len()]);
            basket[column_of[line.product_category.as_str()]] += line.quantity as f64;
        }

        // Column-major: one series per category.
        let series: Vec<Vec<f64>> = (0..categories.len())
            .map(|c| baskets.values().map(|b| b[c]).collect())
            .collect();

        let mut columns = vec!["category".to_string()];
        columns.extend(categories.iter().map(|c| c.to_string()));
        let mut table = Table::new(self.name(), columns);
        for (i, cat) in categories.iter().enumerate() {
            let mut row = vec![Value::Text(cat.to_string())];
            row.extend(
                series
                    .iter()
                    .map(|other| pearson(&series[i], other).map(Value::number).unwrap_or(Value::Missing)),
            );
            table.push_row(row);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::dataset::Dataset;
    use crate::testing::line;

    #[test]
    fn pearson_of_linear_series() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let up = [2.0, 4.0, 6.0, 8.0];
        let down = [4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&x, &up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &down).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn categories_bought_together_correlate() {
        let ts = "2023-06-01 12:00:00";
        let lines = vec![
            line("t1", "c", ts, "P1", "Bakery", 1, 2.0, 0.0),
            line("t1", "c", ts, "P2", "Dairy", 2, 1.0, 0.0),
            line("t2", "c", ts, "P1", "Bakery", 3, 2.0, 0.0),
            line("t2", "c", ts, "P2", "Dairy", 6, 1.0, 0.0),
            line("t3", "c", ts, "P3", "Snacks", 5, 1.0, 0.0),
        ];
        let data = Dataset::new(lines).unwrap();
        let config = ReportConfig::default();
        let t = CategoryAffinity
            .compute(&ViewContext::new(&data, &config))
            .unwrap();
        assert_eq!(t.columns, vec!["category", "Bakery", "Dairy", "Snacks"]);
        assert!((t.number(0, "Dairy").unwrap() - 1.0).abs() < 1e-12);
        assert!(t.number(0, "Snacks").unwrap() < 0.0);
        assert!((t.number(2, "Snacks").unwrap() - 1.0).abs() < 1e-12);
    }
}
