//! Generator integration tests: catalogs, synthesized transactions, flattened lines.

use grocery_core::{
    config::GeneratorConfig,
    dataset::TransactionLine,
    generator::DatasetGenerator,
};
use std::collections::HashMap;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn generator(config: GeneratorConfig) -> DatasetGenerator {
    DatasetGenerator::build(config).expect("valid config")
}

fn sample_lines(seed: u64) -> Vec<TransactionLine> {
    let g = DatasetGenerator::build_test(seed).expect("valid test config");
    let txns = g.generate_transactions();
    g.flatten(&txns)
}

// ── Catalogs ─────────────────────────────────────────────────────────────────

/// The first ceil(0.2 × M) products by creation index are high-demand.
#[test]
fn high_demand_is_the_leading_fifth() {
    let g = generator(GeneratorConfig {
        total_products: 11,
        ..GeneratorConfig::default_test()
    });
    let flags: Vec<bool> = g.catalog().products().iter().map(|p| p.is_high_demand).collect();
    assert_eq!(flags.iter().filter(|f| **f).count(), 3, "ceil(0.2 × 11) = 3");
    assert!(flags[..3].iter().all(|f| *f), "first three must be high-demand: {flags:?}");
    assert!(flags[3..].iter().all(|f| !*f), "the rest must not be: {flags:?}");
    assert_eq!(g.catalog().high_demand_indices(), &[0, 1, 2]);
}

/// Product ids are sequential, padded, and prices sit inside their category range.
#[test]
fn products_follow_category_price_ranges() {
    let g = generator(GeneratorConfig {
        total_products: 200,
        ..GeneratorConfig::default_test()
    });
    let config = &g.config;
    for (i, p) in g.catalog().products().iter().enumerate() {
        assert_eq!(p.product_id, format!("PROD_{:04}", i + 1));
        assert!(p.product_name.ends_with(&format!(" {}", i + 1)), "name {}", p.product_name);
        let cat = config.category(&p.category).expect("known category");
        let scale = if p.category == config.organic_category { config.organic_premium } else { 1.0 };
        assert!(
            p.base_price >= cat.price_min * scale - 0.005 && p.base_price <= cat.price_max * scale + 0.005,
            "{} price {} outside [{}, {}]",
            p.category,
            p.base_price,
            cat.price_min * scale,
            cat.price_max * scale
        );
        assert_eq!(p.base_price, (p.base_price * 100.0).round() / 100.0, "price not rounded to cents");
    }
}

/// Customer ids are unique UUIDs.
#[test]
fn customer_ids_are_unique_uuids() {
    let g = generator(GeneratorConfig {
        total_customers: 500,
        ..GeneratorConfig::default_test()
    });
    let mut ids: Vec<&str> = g.customers().iter().map(|c| c.customer_id.as_str()).collect();
    for id in &ids {
        assert!(uuid::Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 500);
}

// ── Lines ────────────────────────────────────────────────────────────────────

/// Every line's total is round2(q × p × (1 − d)).
#[test]
fn totals_are_derivable() {
    for line in sample_lines(3) {
        let expected = (line.quantity as f64 * line.unit_price * (1.0 - line.discount_applied) * 100.0).round() / 100.0;
        assert!(
            (line.total_price - expected).abs() < 1e-9,
            "{} total {} != {}",
            line.transaction_id,
            line.total_price,
            expected
        );
    }
}

/// Loyalty is stable per customer; discount is stable per transaction.
#[test]
fn per_entity_attributes_are_stable() {
    let lines = sample_lines(11);
    let mut loyalty: HashMap<&str, bool> = HashMap::new();
    let mut discount: HashMap<&str, f64> = HashMap::new();
    for l in &lines {
        let prev = *loyalty.entry(l.customer_id.as_str()).or_insert(l.loyalty_member);
        assert_eq!(prev, l.loyalty_member, "loyalty flipped for {}", l.customer_id);
        let prev = *discount.entry(l.transaction_id.as_str()).or_insert(l.discount_applied);
        assert_eq!(prev, l.discount_applied, "discount differs within {}", l.transaction_id);
    }
}

/// Nonzero discounts come from the configured set.
#[test]
fn discounts_come_from_the_rate_set() {
    for l in sample_lines(5) {
        assert!(
            [0.0, 0.05, 0.10, 0.15].contains(&l.discount_applied),
            "unexpected discount {}",
            l.discount_applied
        );
    }
}

/// Timestamps stay inside the window; baskets hold 1..=15 lines.
#[test]
fn timestamps_and_basket_sizes_are_bounded() {
    let g = DatasetGenerator::build_test(9).unwrap();
    let start = g.config.window_start.and_hms_opt(0, 0, 0).unwrap();
    let end = g.config.window_end.and_hms_opt(0, 0, 0).unwrap();
    for t in g.generate_transactions() {
        assert!(t.timestamp >= start && t.timestamp <= end, "timestamp {} out of window", t.timestamp);
        assert!((1..=15).contains(&t.items.len()), "basket size {}", t.items.len());
        for item in &t.items {
            assert!((1..=100).contains(&item.quantity), "quantity {}", item.quantity);
        }
    }
}

/// Loyalty members receive discounts more often than everyone else.
#[test]
fn loyalty_members_are_discounted_more_often() {
    let g = generator(GeneratorConfig {
        seed: 2024,
        total_transactions: 5_000,
        total_customers: 300,
        ..GeneratorConfig::default_test()
    });
    let (mut loyal, mut loyal_disc, mut other, mut other_disc) = (0u32, 0u32, 0u32, 0u32);
    for t in g.generate_transactions() {
        if t.loyalty_member {
            loyal += 1;
            loyal_disc += (t.discount > 0.0) as u32;
        } else {
            other += 1;
            other_disc += (t.discount > 0.0) as u32;
        }
    }
    assert!(loyal > 0 && other > 0, "need both groups: {loyal} / {other}");
    let loyal_rate = loyal_disc as f64 / loyal as f64;
    let other_rate = other_disc as f64 / other as f64;
    assert!(
        loyal_rate > other_rate,
        "loyalty discount rate {loyal_rate:.3} should exceed {other_rate:.3}"
    );
}

/// Invalid configuration fails before anything is generated.
#[test]
fn invalid_config_is_rejected() {
    let result = DatasetGenerator::build(GeneratorConfig {
        total_customers: 0,
        ..GeneratorConfig::default_test()
    });
    assert!(result.is_err(), "zero customers must not validate");
}
