//! Population generation: the customer and product catalogs.
//!
//! Both catalogs are built once per run, before any transaction is
//! synthesized, and are immutable afterwards. Transactions reference
//! them by id; attributes are copied only when a transaction is
//! flattened into lines.

use crate::{
    config::GeneratorConfig,
    name_generator::NameGenerator,
    rng::StreamRng,
    types::{round_cents, CustomerId, ProductId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub is_loyalty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub product_name: String,
    pub category: String,
    pub base_price: f64,
    pub is_high_demand: bool,
}

/// The product list in creation order plus the high-demand subset.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Vec<ProductRecord>,
    high_demand: Vec<usize>,
}

impl ProductCatalog {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        let high_demand = products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_high_demand)
            .map(|(i, _)| i)
            .collect();
        Self {
            products,
            high_demand,
        }
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, index: usize) -> &ProductRecord {
        &self.products[index]
    }

    /// Indices (creation order) of the high-demand products.
    pub fn high_demand_indices(&self) -> &[usize] {
        &self.high_demand
    }
}

/// Generate N customers with independent loyalty draws.
pub fn generate_customers(config: &GeneratorConfig, rng: &mut StreamRng) -> Vec<CustomerRecord> {
    let n = config.total_customers;
    let mut customers = Vec::with_capacity(n);
    for _ in 0..n {
        let customer_id = rng.uuid().to_string();
        let is_loyalty = rng.chance(config.loyalty_probability);
        customers.push(CustomerRecord {
            customer_id,
            is_loyalty,
        });
    }
    let loyal = customers.iter().filter(|c| c.is_loyalty).count();
    log::info!("population: generated {n} customers ({loyal} loyalty members)");
    customers
}

/// Generate M products in sequential creation order.
///
/// The first `ceil(high_demand_share × M)` products by creation index
/// carry the high-demand flag. This is positional, not random.
pub fn generate_products(config: &GeneratorConfig, rng: &mut StreamRng) -> ProductCatalog {
    let m = config.total_products;
    let high_demand_count = config.high_demand_count();
    let mut products = Vec::with_capacity(m);

    for i in 0..m {
        let category = &config.categories[rng.pick_index(config.categories.len())];
        let product_name = NameGenerator::product_name(category, i, rng);

        let (mut min_price, mut max_price) = (category.price_min, category.price_max);
        if category.name == config.organic_category {
            min_price *= config.organic_premium;
            max_price *= config.organic_premium;
        }

        products.push(ProductRecord {
            product_id: NameGenerator::product_id(i),
            product_name,
            category: category.name.clone(),
            base_price: round_cents(rng.uniform(min_price, max_price)),
            is_high_demand: i < high_demand_count,
        });
    }

    log::info!("population: generated {m} products ({high_demand_count} high-demand)");
    ProductCatalog::new(products)
}
