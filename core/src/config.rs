//! Generator and report configuration.
//!
//! RULE: No stage reads a module-level constant for categories,
//! weights or margins. Everything lives in GeneratorConfig or
//! ReportConfig and is passed in explicitly.

use crate::error::{GroceryError, GroceryResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ── Generator ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    pub name: String,
    pub price_min: f64,
    pub price_max: f64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedChoice {
    pub name: String,
    pub weight: f64,
}

/// Acceptance probabilities for the timestamp rejection loop.
/// These are independent accept/reject draws per branch, not a
/// distribution: they intentionally do not sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcceptanceConfig {
    pub weekend: f64,
    pub holiday_week: f64,
    pub regular: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            weekend: 0.3,
            holiday_week: 0.2,
            regular: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BasketConfig {
    pub min_items: u64,
    pub max_items: u64,
    /// Chance that a basket slot is filled from the high-demand subset.
    pub high_demand_pick_probability: f64,
    pub quantity_min: u64,
    pub quantity_max: u64,
    pub bulk_probability: f64,
    pub bulk_min: u64,
    pub bulk_max: u64,
    pub anomaly_probability: f64,
    pub anomaly_min: u64,
    pub anomaly_max: u64,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            min_items: 1,
            max_items: 15,
            high_demand_pick_probability: 0.3,
            quantity_min: 1,
            quantity_max: 10,
            bulk_probability: 0.1,
            bulk_min: 6,
            bulk_max: 10,
            anomaly_probability: 0.001,
            anomaly_min: 50,
            anomaly_max: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscountConfig {
    pub rates: Vec<f64>,
    pub loyalty_probability: f64,
    pub standard_probability: f64,
}

impl Default for DiscountConfig {
    fn default() -> Self {
        Self {
            rates: vec![0.05, 0.10, 0.15],
            loyalty_probability: 0.4,
            standard_probability: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub total_transactions: usize,
    pub total_customers: usize,
    pub total_products: usize,
    pub files_to_split: usize,
    pub output_dir: String,
    pub file_prefix: String,
    pub loyalty_probability: f64,
    /// Share of the catalog (by creation order) flagged high-demand.
    pub high_demand_share: f64,
    pub organic_category: String,
    pub organic_premium: f64,
    pub categories: Vec<CategoryConfig>,
    pub store_locations: Vec<WeightedChoice>,
    pub payment_methods: Vec<String>,
    pub discount: DiscountConfig,
    pub basket: BasketConfig,
    pub acceptance: AcceptanceConfig,
    /// First day of the timestamp window (00:00:00).
    pub window_start: NaiveDate,
    /// Last instant of the window is 00:00:00 on this day.
    pub window_end: NaiveDate,
    pub holidays: Vec<NaiveDate>,
    /// Log a progress line every this many transactions.
    pub progress_interval: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_transactions: 100_000,
            total_customers: 10_000,
            total_products: 2_000,
            files_to_split: 10,
            output_dir: "output".into(),
            file_prefix: "grocery_transactions".into(),
            loyalty_probability: 0.3,
            high_demand_share: 0.2,
            organic_category: "Organic".into(),
            organic_premium: 1.2,
            categories: default_categories(),
            store_locations: vec![
                choice("Downtown", 0.4),
                choice("Suburb North", 0.25),
                choice("Suburb South", 0.25),
                choice("Coastal", 0.1),
            ],
            payment_methods: ["Credit Card", "Debit Card", "Cash", "Mobile Wallet"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            discount: DiscountConfig::default(),
            basket: BasketConfig::default(),
            acceptance: AcceptanceConfig::default(),
            window_start: ymd(2023, 1, 1),
            window_end: ymd(2023, 12, 31),
            holidays: vec![
                ymd(2023, 1, 1),   // New Year's
                ymd(2023, 12, 25), // Christmas
                ymd(2023, 11, 23), // Thanksgiving
                ymd(2023, 7, 4),   // Independence Day
                ymd(2023, 5, 29),  // Memorial Day
                ymd(2023, 9, 4),   // Labor Day
            ],
            progress_interval: 10_000,
        }
    }
}

impl GeneratorConfig {
    /// Load a JSON override file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> GroceryResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small run used across the test suites.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            total_transactions: 100,
            total_customers: 20,
            total_products: 10,
            files_to_split: 2,
            ..Self::default()
        }
    }

    /// Number of products flagged high-demand: ceil(share × M).
    pub fn high_demand_count(&self) -> usize {
        (self.high_demand_share * self.total_products as f64).ceil() as usize
    }

    /// Fail fast on anything that would make generation ill-defined.
    pub fn validate(&self) -> GroceryResult<()> {
        positive("total_transactions", self.total_transactions)?;
        positive("total_customers", self.total_customers)?;
        positive("total_products", self.total_products)?;
        positive("files_to_split", self.files_to_split)?;
        if self.file_prefix.is_empty() {
            return Err(GroceryError::invalid_config("file_prefix", "must not be empty"));
        }

        probability("loyalty_probability", self.loyalty_probability)?;
        probability("discount.loyalty_probability", self.discount.loyalty_probability)?;
        probability("discount.standard_probability", self.discount.standard_probability)?;
        probability("basket.high_demand_pick_probability", self.basket.high_demand_pick_probability)?;
        probability("basket.bulk_probability", self.basket.bulk_probability)?;
        probability("basket.anomaly_probability", self.basket.anomaly_probability)?;
        probability("acceptance.weekend", self.acceptance.weekend)?;
        probability("acceptance.holiday_week", self.acceptance.holiday_week)?;
        probability("acceptance.regular", self.acceptance.regular)?;
        if self.high_demand_share <= 0.0 || self.high_demand_share > 1.0 {
            return Err(GroceryError::invalid_config(
                "high_demand_share",
                "must be in (0, 1]",
            ));
        }
        if self.acceptance.regular <= 0.0 {
            return Err(GroceryError::invalid_config(
                "acceptance.regular",
                "must be > 0 or the timestamp loop never terminates",
            ));
        }
        if self.organic_premium <= 0.0 {
            return Err(GroceryError::invalid_config("organic_premium", "must be > 0"));
        }

        if self.categories.is_empty() {
            return Err(GroceryError::invalid_config("categories", "must not be empty"));
        }
        for cat in &self.categories {
            if cat.items.is_empty() {
                return Err(GroceryError::invalid_config(
                    format!("categories.{}.items", cat.name),
                    "name pool must not be empty",
                ));
            }
            if cat.price_min < 0.0 || cat.price_min > cat.price_max {
                return Err(GroceryError::invalid_config(
                    format!("categories.{}", cat.name),
                    format!("invalid price range {}..{}", cat.price_min, cat.price_max),
                ));
            }
        }

        if self.store_locations.is_empty() {
            return Err(GroceryError::invalid_config("store_locations", "must not be empty"));
        }
        if self.store_locations.iter().any(|s| s.weight <= 0.0) {
            return Err(GroceryError::invalid_config("store_locations", "weights must be > 0"));
        }
        if self.payment_methods.is_empty() {
            return Err(GroceryError::invalid_config("payment_methods", "must not be empty"));
        }
        if self.discount.rates.is_empty() {
            return Err(GroceryError::invalid_config("discount.rates", "must not be empty"));
        }
        if self.discount.rates.iter().any(|r| *r <= 0.0 || *r >= 1.0) {
            return Err(GroceryError::invalid_config("discount.rates", "each rate must be in (0, 1)"));
        }

        let b = &self.basket;
        range("basket.items", b.min_items, b.max_items)?;
        range("basket.quantity", b.quantity_min, b.quantity_max)?;
        range("basket.bulk", b.bulk_min, b.bulk_max)?;
        range("basket.anomaly", b.anomaly_min, b.anomaly_max)?;
        if b.min_items == 0 || b.quantity_min == 0 {
            return Err(GroceryError::invalid_config("basket", "item and quantity minimums must be ≥ 1"));
        }

        if self.window_start > self.window_end {
            return Err(GroceryError::invalid_config("window_start", "must not be after window_end"));
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }
}

fn positive(field: &str, value: usize) -> GroceryResult<()> {
    if value == 0 {
        return Err(GroceryError::invalid_config(field, "must be > 0"));
    }
    Ok(())
}

fn probability(field: &str, value: f64) -> GroceryResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GroceryError::invalid_config(field, format!("{value} is not a probability")));
    }
    Ok(())
}

fn range(field: &str, low: u64, high: u64) -> GroceryResult<()> {
    if low > high {
        return Err(GroceryError::invalid_config(field, format!("empty range {low}..={high}")));
    }
    Ok(())
}

fn choice(name: &str, weight: f64) -> WeightedChoice {
    WeightedChoice {
        name: name.into(),
        weight,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn category(name: &str, price_min: f64, price_max: f64, items: [&str; 5]) -> CategoryConfig {
    CategoryConfig {
        name: name.into(),
        price_min,
        price_max,
        items: items.iter().map(|s| s.to_string()).collect(),
    }
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        category("Dairy", 2.99, 8.99,
            ["Whole Milk", "Greek Yogurt", "Cheddar Cheese", "Butter", "Cream"]),
        category("Bakery", 1.99, 12.99,
            ["Whole Wheat Bread", "Croissants", "Bagels", "Muffins", "Danish"]),
        category("Produce", 0.99, 7.99,
            ["Bananas", "Apples", "Carrots", "Spinach", "Tomatoes"]),
        category("Meat", 5.99, 25.99,
            ["Chicken Breast", "Ground Beef", "Salmon", "Pork Chops", "Turkey"]),
        category("Frozen Foods", 3.99, 15.99,
            ["Ice Cream", "Frozen Pizza", "Frozen Vegetables", "TV Dinner", "Fish Sticks"]),
        category("Snacks", 1.99, 6.99,
            ["Potato Chips", "Pretzels", "Popcorn", "Trail Mix", "Cookies"]),
        category("Beverages", 2.99, 9.99,
            ["Cola", "Coffee", "Orange Juice", "Energy Drink", "Water"]),
        category("Organic", 3.99, 15.99,
            ["Organic Eggs", "Organic Milk", "Organic Quinoa", "Organic Berries", "Organic Honey"]),
        category("Pantry", 1.99, 12.99,
            ["Pasta", "Rice", "Cereal", "Peanut Butter", "Soup"]),
        category("Personal Care", 2.99, 19.99,
            ["Shampoo", "Toothpaste", "Soap", "Deodorant", "Lotion"]),
    ]
}

// ── Report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Category → margin fraction (0.45 = 45%).
    pub category_margins: BTreeMap<String, f64>,
    /// Margin applied to categories missing from the table.
    pub default_margin: f64,
    pub urban_locations: Vec<String>,
    pub suburban_locations: Vec<String>,
    /// Customers idle longer than this count toward churn risk.
    pub churn_threshold_days: i64,
    /// Idle threshold for the high-value at-risk list.
    pub at_risk_idle_days: i64,
    pub anomaly_z_threshold: f64,
    pub high_value_multiplier: f64,
    /// Products selling fewer units per day than this are slow-moving.
    pub slow_moving_units_per_day: f64,
    pub days_per_month: f64,
    /// Month-day strings (`MM-DD`) treated as holidays by the marketing views.
    pub holiday_days: Vec<String>,
    pub top_n: usize,
    pub short_moving_average: usize,
    pub long_moving_average: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let category_margins = [
            ("Organic", 0.45),
            ("Meat", 0.35),
            ("Dairy", 0.30),
            ("Produce", 0.25),
            ("Bakery", 0.40),
            ("Frozen Foods", 0.35),
            ("Snacks", 0.50),
            ("Beverages", 0.45),
            ("Pantry", 0.40),
            ("Personal Care", 0.55),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();

        Self {
            category_margins,
            default_margin: 0.0,
            urban_locations: vec!["Downtown".into()],
            suburban_locations: vec!["Suburb North".into(), "Suburb South".into()],
            churn_threshold_days: 90,
            at_risk_idle_days: 60,
            anomaly_z_threshold: 3.0,
            high_value_multiplier: 3.0,
            slow_moving_units_per_day: 1.0,
            days_per_month: 30.0,
            holiday_days: ["12-25", "11-23", "07-04", "01-01"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            top_n: 10,
            short_moving_average: 7,
            long_moving_average: 30,
        }
    }
}

impl ReportConfig {
    pub fn load(path: impl AsRef<Path>) -> GroceryResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GroceryResult<()> {
        if self.category_margins.is_empty() {
            return Err(GroceryError::invalid_config("category_margins", "must not be empty"));
        }
        if let Some((cat, m)) = self
            .category_margins
            .iter()
            .find(|(_, m)| !(0.0..1.0).contains(*m))
        {
            return Err(GroceryError::invalid_config(
                format!("category_margins.{cat}"),
                format!("{m} is not a margin fraction"),
            ));
        }
        if self.days_per_month <= 0.0 {
            return Err(GroceryError::invalid_config("days_per_month", "must be > 0"));
        }
        if self.short_moving_average == 0 || self.long_moving_average == 0 {
            return Err(GroceryError::invalid_config("moving_average", "windows must be > 0"));
        }
        Ok(())
    }

    pub fn margin_for(&self, category: &str) -> f64 {
        self.category_margins
            .get(category)
            .copied()
            .unwrap_or(self.default_margin)
    }

    pub fn location_type(&self, location: &str) -> &'static str {
        if self.urban_locations.iter().any(|l| l == location) {
            "Urban"
        } else if self.suburban_locations.iter().any(|l| l == location) {
            "Suburban"
        } else {
            "Other"
        }
    }
}
