//! Report integration tests: views and metrics over generated and hand-built data.

use grocery_core::{
    config::ReportConfig,
    dataset::{datetime_format, Dataset, TransactionLine},
    generator::DatasetGenerator,
    report::Report,
    table::Value,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn generated(seed: u64, transactions: usize) -> Dataset {
    let g = DatasetGenerator::build(grocery_core::config::GeneratorConfig {
        seed,
        total_transactions: transactions,
        ..grocery_core::config::GeneratorConfig::default_test()
    })
    .unwrap();
    Dataset::new(g.flatten(&g.generate_transactions())).unwrap()
}

fn line(txn: &str, customer: &str, ts: &str, product: &str, quantity: u32, price: f64) -> TransactionLine {
    TransactionLine {
        transaction_id: txn.into(),
        customer_id: customer.into(),
        transaction_datetime: datetime_format::parse(ts).unwrap(),
        store_location: "Downtown".into(),
        product_id: product.into(),
        product_name: format!("{product} item"),
        product_category: "Pantry".into(),
        quantity,
        unit_price: price,
        total_price: TransactionLine::expected_total(quantity, price, 0.0),
        payment_method: "Cash".into(),
        loyalty_member: false,
        discount_applied: 0.0,
    }
}

fn report() -> Report {
    Report::standard(ReportConfig::default())
}

// ── Views ────────────────────────────────────────────────────────────────────

/// Every standard view runs over a generated dataset.
#[test]
fn all_views_run_on_generated_data() {
    let data = generated(17, 400);
    let report = report();
    let output = report.run_all(&data).unwrap();
    assert_eq!(output.views.len(), report.len());
    for table in &output.views {
        for row in &table.rows {
            assert_eq!(row.len(), table.columns.len(), "ragged row in {}", table.name);
        }
    }
    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains("\"category_sales\""));
}

/// Category sales add up to the dataset total.
#[test]
fn category_sales_sum_to_total() {
    let data = generated(4, 300);
    let t = report().run_view(&data, "category_sales").unwrap();
    let sum: f64 = t.numbers("total_sales").iter().sum();
    assert!((sum - data.total_sales()).abs() < 1e-6, "{sum} vs {}", data.total_sales());
}

/// Regional preference shares sum to one within each store.
#[test]
fn regional_shares_sum_to_one() {
    let data = generated(6, 300);
    let t = report().run_view(&data, "regional_preferences").unwrap();
    let mut per_store = std::collections::BTreeMap::<String, f64>::new();
    for r in 0..t.len() {
        let store = t.text(r, "store_location").unwrap().to_string();
        *per_store.entry(store).or_default() += t.number(r, "share_of_store").unwrap();
    }
    for (store, total) in per_store {
        assert!((total - 1.0).abs() < 1e-9, "{store}: {total}");
    }
}

/// Top products are limited and ordered by revenue.
#[test]
fn top_products_are_sorted_and_limited() {
    let data = generated(12, 400);
    let t = report().run_view(&data, "top_products").unwrap();
    assert!(t.len() <= ReportConfig::default().top_n);
    let revenue = t.numbers("revenue");
    assert!(revenue.windows(2).all(|w| w[0] >= w[1]), "not descending: {revenue:?}");
}

/// A product bought in a constant quantity scores z = 0 on every line.
#[test]
fn constant_quantity_scores_zero() {
    let lines = vec![
        line("t1", "a", "2023-03-01 10:00:00", "P1", 3, 2.0),
        line("t2", "b", "2023-03-02 10:00:00", "P1", 3, 2.0),
        line("t3", "c", "2023-03-03 10:00:00", "P1", 3, 2.0),
        line("t3", "c", "2023-03-03 10:00:00", "P2", 1, 4.0),
        line("t4", "a", "2023-03-04 10:00:00", "P2", 9, 4.0),
    ];
    let data = Dataset::new(lines).unwrap();
    let t = report().run_view(&data, "anomaly_scan").unwrap();
    for r in 0..t.len() {
        if t.text(r, "product_id") == Some("P1") {
            assert_eq!(t.number(r, "quantity_zscore"), Some(0.0), "row {r}");
        }
    }
}

/// Demand forecast leaves the first window − 1 days undefined.
#[test]
fn moving_averages_start_after_a_full_window() {
    let data = generated(30, 600);
    let t = report().run_view(&data, "demand_forecast").unwrap();
    let short = ReportConfig::default().short_moving_average;
    assert!(t.len() > short, "need more than {short} days");
    for r in 0..short - 1 {
        assert_eq!(t.value(r, "short_moving_average"), Some(&Value::Missing), "row {r}");
    }
    assert!(t.number(short - 1, "short_moving_average").is_some());
}

/// Unknown view names surface as errors.
#[test]
fn unknown_view_errors() {
    let data = generated(1, 50);
    assert!(report().run_view(&data, "does_not_exist").is_err());
}

// ── Metrics ──────────────────────────────────────────────────────────────────

/// Metric blocks agree with the dataset's own accessors.
#[test]
fn key_metrics_match_dataset() {
    let data = generated(77, 300);
    let m = report().metrics(&data);
    assert_eq!(m.key.transactions, data.distinct_transactions());
    assert_eq!(m.key.customers, data.distinct_customers());
    assert!((m.key.total_sales - data.total_sales()).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&m.retention.churn_risk_pct));
    assert!((0.0..=100.0).contains(&m.retention.repeat_rate_pct));
    assert!(m.financial.highest_margin_category.is_some());
}

/// Customer segments cover every customer once.
#[test]
fn segments_cover_every_customer() {
    let data = generated(19, 300);
    let t = report().run_view(&data, "customer_segments").unwrap();
    assert_eq!(t.len(), data.distinct_customers());
    for r in 0..t.len() {
        let seg = t.text(r, "spend_segment").unwrap();
        assert!(["Low Spender", "Medium Spender", "High Spender"].contains(&seg), "{seg}");
    }
}
