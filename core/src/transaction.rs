//! Transaction synthesis: one randomized basket at a time.
//!
//! DRAW ORDER (fixed; changing it changes every seeded dataset):
//!   1. customer
//!   2. timestamp (rejection loop)
//!   3. basket size
//!   4. per slot: product pool, product, quantity, bulk, anomaly
//!   5. store location, payment method
//!   6. discount
//!   7. transaction id

use crate::{
    calendar::{is_weekend, Calendar},
    config::GeneratorConfig,
    dataset::TransactionLine,
    population::{CustomerRecord, ProductCatalog},
    rng::StreamRng,
    types::{CustomerId, DiscountRate, TransactionId},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A basket slot: catalog index (creation order) and quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub product_index: usize,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub customer_id: CustomerId,
    pub timestamp: NaiveDateTime,
    pub store_location: String,
    pub items: Vec<LineItem>,
    pub payment_method: String,
    pub loyalty_member: bool,
    pub discount: DiscountRate,
}

impl Transaction {
    /// Expand into one line per basket slot, copying product
    /// attributes from the catalog and computing each total.
    pub fn flatten(&self, catalog: &ProductCatalog) -> Vec<TransactionLine> {
        self.items
            .iter()
            .map(|item| {
                let product = catalog.get(item.product_index);
                TransactionLine {
                    transaction_id: self.transaction_id.clone(),
                    customer_id: self.customer_id.clone(),
                    transaction_datetime: self.timestamp,
                    store_location: self.store_location.clone(),
                    product_id: product.product_id.clone(),
                    product_name: product.product_name.clone(),
                    product_category: product.category.clone(),
                    quantity: item.quantity,
                    unit_price: product.base_price,
                    total_price: TransactionLine::expected_total(
                        item.quantity,
                        product.base_price,
                        self.discount,
                    ),
                    payment_method: self.payment_method.clone(),
                    loyalty_member: self.loyalty_member,
                    discount_applied: self.discount,
                }
            })
            .collect()
    }
}

pub struct TransactionSynthesizer<'a> {
    config: &'a GeneratorConfig,
    calendar: Calendar,
    customers: &'a [CustomerRecord],
    catalog: &'a ProductCatalog,
    store_weights: Vec<f64>,
}

impl<'a> TransactionSynthesizer<'a> {
    /// `customers` and `catalog` must be non-empty; GeneratorConfig
    /// validation guarantees that for generated populations.
    pub fn new(
        config: &'a GeneratorConfig,
        customers: &'a [CustomerRecord],
        catalog: &'a ProductCatalog,
    ) -> Self {
        Self {
            config,
            calendar: Calendar::from_config(config),
            customers,
            catalog,
            store_weights: config.store_locations.iter().map(|s| s.weight).collect(),
        }
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn synthesize(&self, rng: &mut StreamRng) -> Transaction {
        let customer = &self.customers[rng.pick_index(self.customers.len())];
        let timestamp = self.draw_timestamp(rng);

        let basket = &self.config.basket;
        let basket_size = rng.range_inclusive(basket.min_items, basket.max_items);
        let items = (0..basket_size).map(|_| self.draw_item(rng)).collect();

        let store_location =
            self.config.store_locations[rng.weighted_index(&self.store_weights)].name.clone();
        let payment_method =
            self.config.payment_methods[rng.pick_index(self.config.payment_methods.len())].clone();
        let discount = self.draw_discount(customer.is_loyalty, rng);

        Transaction {
            transaction_id: rng.uuid().to_string(),
            customer_id: customer.customer_id.clone(),
            timestamp,
            store_location,
            items,
            payment_method,
            loyalty_member: customer.is_loyalty,
            discount,
        }
    }

    /// Uniform candidate in the window, accepted through three
    /// independent branch draws; redraw on rejection. A weekend that
    /// fails its 0.3 draw falls through to the holiday and regular
    /// branches, so the branches are tested in this order only.
    pub fn draw_timestamp(&self, rng: &mut StreamRng) -> NaiveDateTime {
        let acceptance = &self.config.acceptance;
        loop {
            let offset = rng.range_inclusive(0, self.calendar.window_seconds() as u64);
            let candidate = self.calendar.at_offset(offset as i64);
            let date = candidate.date();

            if is_weekend(date) && rng.chance(acceptance.weekend) {
                return candidate;
            } else if self.calendar.is_holiday_week(date) && rng.chance(acceptance.holiday_week) {
                return candidate;
            } else if rng.chance(acceptance.regular) {
                return candidate;
            }
        }
    }

    fn draw_item(&self, rng: &mut StreamRng) -> LineItem {
        let basket = &self.config.basket;
        let high_demand = self.catalog.high_demand_indices();

        let product_index = if rng.chance(basket.high_demand_pick_probability) && !high_demand.is_empty() {
            high_demand[rng.pick_index(high_demand.len())]
        } else {
            rng.pick_index(self.catalog.len())
        };

        let mut quantity = rng.range_inclusive(basket.quantity_min, basket.quantity_max);
        if rng.chance(basket.bulk_probability) {
            quantity = rng.range_inclusive(basket.bulk_min, basket.bulk_max);
        }
        // Independent of the bulk draw and may override it.
        if rng.chance(basket.anomaly_probability) {
            quantity = rng.range_inclusive(basket.anomaly_min, basket.anomaly_max);
        }

        LineItem {
            product_index,
            quantity: quantity as u32,
        }
    }

    fn draw_discount(&self, is_loyalty: bool, rng: &mut StreamRng) -> DiscountRate {
        let discount = &self.config.discount;
        let p = if is_loyalty {
            discount.loyalty_probability
        } else {
            discount.standard_probability
        };
        if rng.chance(p) {
            discount.rates[rng.pick_index(discount.rates.len())]
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calendar::DayClass,
        population::{generate_customers, generate_products},
        rng::{RngBank, StreamSlot},
    };

    fn fixtures(config: &GeneratorConfig) -> (Vec<CustomerRecord>, ProductCatalog) {
        let bank = RngBank::new(config.seed);
        let customers = generate_customers(config, &mut bank.for_stream(StreamSlot::Customer));
        let catalog = generate_products(config, &mut bank.for_stream(StreamSlot::Product));
        (customers, catalog)
    }

    #[test]
    fn basket_sizes_and_quantities_stay_in_bounds() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let mut rng = RngBank::new(3).for_stream(StreamSlot::Transaction);

        for _ in 0..500 {
            let txn = synth.synthesize(&mut rng);
            assert!((1..=15).contains(&txn.items.len()), "basket size {}", txn.items.len());
            for item in &txn.items {
                assert!(item.product_index < catalog.len());
                assert!(
                    (1..=10).contains(&item.quantity) || (50..=100).contains(&item.quantity),
                    "quantity {} outside both supports",
                    item.quantity
                );
            }
        }
    }

    #[test]
    fn flatten_copies_transaction_fields_to_every_line() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let mut rng = RngBank::new(4).for_stream(StreamSlot::Transaction);

        let txn = synth.synthesize(&mut rng);
        let lines = txn.flatten(&catalog);
        assert_eq!(lines.len(), txn.items.len());
        for (line, item) in lines.iter().zip(&txn.items) {
            assert_eq!(line.transaction_id, txn.transaction_id);
            assert_eq!(line.discount_applied, txn.discount);
            assert_eq!(line.loyalty_member, txn.loyalty_member);
            assert_eq!(line.product_id, catalog.get(item.product_index).product_id);
            assert_eq!(line.total_price, line.recomputed_total());
        }
    }

    #[test]
    fn timestamps_stay_inside_the_window() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let mut rng = RngBank::new(8).for_stream(StreamSlot::Transaction);

        let start = config.window_start.and_hms_opt(0, 0, 0).unwrap();
        let end = config.window_end.and_hms_opt(0, 0, 0).unwrap();
        for _ in 0..1_000 {
            let ts = synth.draw_timestamp(&mut rng);
            assert!(ts >= start && ts <= end, "{ts} outside window");
        }
    }

    /// Weekends accept with 0.3 + 0.7·0.5 (= 0.65) per candidate, regular
    /// days with 0.5, so weekend share rises above the calendar's 2/7.
    #[test]
    fn rejection_loop_tilts_toward_weekends() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let mut rng = RngBank::new(21).for_stream(StreamSlot::Transaction);

        let n = 20_000;
        let weekend = (0..n)
            .filter(|_| synth.calendar().classify(synth.draw_timestamp(&mut rng)) == DayClass::Weekend)
            .count();
        let share = weekend as f64 / n as f64;
        assert!(share > 0.30 && share < 0.40, "weekend share {share:.3}");
    }

    /// Weekdays inside a holiday week accept with 0.2 + 0.8·0.5 (= 0.6)
    /// per candidate against 0.5 on regular weekdays: per-day density
    /// ratio about 1.2. Without the holiday branch it would be 1.0.
    #[test]
    fn holiday_week_weekdays_accept_more_often_than_regular_days() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let calendar = synth.calendar();
        let mut rng = RngBank::new(34).for_stream(StreamSlot::Transaction);

        let class_of = |d: chrono::NaiveDate| calendar.classify(d.and_hms_opt(12, 0, 0).unwrap());
        let days_in = |class: DayClass| {
            config
                .window_start
                .iter_days()
                .take_while(|d| *d < config.window_end)
                .filter(|d| class_of(*d) == class)
                .count() as f64
        };
        let holiday_days = days_in(DayClass::HolidayWeek);
        let regular_days = days_in(DayClass::Regular);
        assert!(holiday_days >= 20.0, "only {holiday_days} holiday-week weekdays");

        let (mut holiday, mut regular) = (0usize, 0usize);
        for _ in 0..60_000 {
            match calendar.classify(synth.draw_timestamp(&mut rng)) {
                DayClass::HolidayWeek => holiday += 1,
                DayClass::Regular => regular += 1,
                DayClass::Weekend => {}
            }
        }
        let ratio = (holiday as f64 / holiday_days) / (regular as f64 / regular_days);
        assert!(ratio > 1.1 && ratio < 1.3, "holiday/regular density ratio {ratio:.3}");
    }

    #[test]
    fn discounts_come_from_the_rate_set() {
        let config = GeneratorConfig::default_test();
        let (customers, catalog) = fixtures(&config);
        let synth = TransactionSynthesizer::new(&config, &customers, &catalog);
        let mut rng = RngBank::new(5).for_stream(StreamSlot::Transaction);

        for _ in 0..1_000 {
            let d = synth.synthesize(&mut rng).discount;
            assert!(
                d == 0.0 || config.discount.rates.contains(&d),
                "unexpected discount {d}"
            );
        }
    }
}
