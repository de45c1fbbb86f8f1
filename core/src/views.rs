//! The dashboard's group-by views, declared as data.
//!
//! RULE: Adding a view means adding an entry here.
//! Nothing in this file walks lines. Every entry is evaluated by
//! `ViewSpec::evaluate`. Views that need more than one grouping pass
//! live in their own modules and are registered by `Report::standard`.

use crate::{
    aggregate::{
        Agg::{Count, Distinct, Max, Mean, Std, Sum},
        Derived, Dimension as D, Measure as M, Order, ViewSpec,
    },
    config::ReportConfig,
};

pub fn standard_views(config: &ReportConfig) -> Vec<ViewSpec> {
    let mut views = Vec::new();
    views.extend(sales_views());
    views.extend(time_views(config));
    views.extend(product_views(config));
    views.extend(marketing_views());
    views.extend(geographic_views());
    views.extend(financial_views());
    views
}

/// Sales, distinct transactions and customers, and average
/// transaction value for one grouping dimension.
fn breakdown(name: &'static str, title: &'static str, column: &'static str, dim: D) -> ViewSpec {
    ViewSpec::new(name, title)
        .key(column, dim)
        .agg("total_sales", Sum(M::TotalPrice))
        .agg("transactions", Distinct(D::Transaction))
        .agg("customers", Distinct(D::Customer))
        .agg("quantity", Sum(M::Quantity))
        .ratio("avg_transaction_value", "total_sales", "transactions")
}

fn margin_view(name: &'static str, title: &'static str, column: &'static str, dim: D) -> ViewSpec {
    ViewSpec::new(name, title)
        .key(column, dim)
        .agg("revenue", Sum(M::TotalPrice))
        .agg("margin", Sum(M::Margin))
        .agg("quantity", Sum(M::Quantity))
        .derive(Derived::Ratio {
            name: "margin_pct",
            numerator: "margin",
            denominator: "revenue",
            scale: 100.0,
        })
}

// ── Sales ───────────────────────────────────────────────────────────────────

fn sales_views() -> Vec<ViewSpec> {
    vec![
        breakdown("category_sales", "Sales by Category", "product_category", D::Category),
        breakdown("store_performance", "Store Performance", "store_location", D::StoreLocation),
        breakdown("payment_methods", "Payment Methods", "payment_method", D::PaymentMethod),
        breakdown("loyalty_breakdown", "Loyalty vs Non-Loyalty", "loyalty_member", D::Loyalty),
        ViewSpec::new("basket_composition", "Basket Composition")
            .key("transaction_id", D::Transaction)
            .agg("lines", Count)
            .agg("items", Sum(M::Quantity))
            .agg("categories", Distinct(D::Category))
            .agg("basket_value", Sum(M::TotalPrice))
            .agg("loyalty_member", Max(M::Loyalty)),
    ]
}

// ── Time ────────────────────────────────────────────────────────────────────

fn time_views(config: &ReportConfig) -> Vec<ViewSpec> {
    vec![
        ViewSpec::new("daily_sales", "Daily Sales")
            .key("date", D::Date)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_line_value", Mean(M::TotalPrice))
            .agg("lines", Count)
            .agg("transactions", Distinct(D::Transaction)),
        ViewSpec::new("hourly_pattern", "Hourly Sales Pattern")
            .key("hour", D::Hour)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_line_value", Mean(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction)),
        ViewSpec::new("weekday_trends", "Weekday Trends")
            .key("weekday", D::Weekday)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .agg("quantity", Sum(M::Quantity)),
        ViewSpec::new("weekly_trends", "Weekly Trends")
            .key("week", D::Week)
            .key("weekday", D::Weekday)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction)),
        ViewSpec::new("monthly_trends", "Monthly Trends")
            .key("month", D::Month)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .agg("customers", Distinct(D::Customer)),
        ViewSpec::new("seasonal_categories", "Seasonal Category Performance")
            .key("season", D::Season)
            .key("product_category", D::Category)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("quantity", Sum(M::Quantity)),
        ViewSpec::new("product_seasonality", "Category Share by Month")
            .key("month", D::Month)
            .key("product_category", D::Category)
            .agg("total_sales", Sum(M::TotalPrice))
            .share("share_of_month", "total_sales", 1),
        ViewSpec::new("peak_hours", "Peak Hours by Weekday")
            .key("weekday", D::Weekday)
            .key("hour", D::Hour)
            .agg("transactions", Distinct(D::Transaction)),
        ViewSpec::new("demand_forecast", "Daily Demand with Moving Averages")
            .key("date", D::Date)
            .agg("quantity", Sum(M::Quantity))
            .agg("total_sales", Sum(M::TotalPrice))
            .derive(Derived::Rolling {
                name: "short_moving_average",
                column: "quantity",
                window: config.short_moving_average,
            })
            .derive(Derived::Rolling {
                name: "long_moving_average",
                column: "quantity",
                window: config.long_moving_average,
            }),
        ViewSpec::new("holiday_performance", "Holiday Performance")
            .key("holiday", D::Holiday)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_sale", Mean(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction)),
    ]
}

// ── Products and inventory ──────────────────────────────────────────────────

fn product_views(config: &ReportConfig) -> Vec<ViewSpec> {
    vec![
        ViewSpec::new("top_products", "Top Products by Revenue")
            .key("product_id", D::Product)
            .key("product_name", D::ProductName)
            .agg("revenue", Sum(M::TotalPrice))
            .agg("quantity", Sum(M::Quantity))
            .sort_by("revenue", Order::Descending)
            .limit(config.top_n),
        ViewSpec::new("product_performance", "Product Performance")
            .key("product_id", D::Product)
            .key("product_name", D::ProductName)
            .key("product_category", D::Category)
            .agg("quantity", Sum(M::Quantity))
            .agg("revenue", Sum(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .agg("avg_unit_price", Mean(M::UnitPrice))
            .sort_by("revenue", Order::Descending),
        ViewSpec::new("inventory_movement", "Inventory Movement")
            .key("product_id", D::Product)
            .key("product_name", D::ProductName)
            .key("product_category", D::Category)
            .agg("quantity", Sum(M::Quantity))
            .agg("transactions", Distinct(D::Transaction))
            .agg("revenue", Sum(M::TotalPrice))
            .derive(Derived::PerDay {
                name: "daily_sales_rate",
                column: "quantity",
                scale: 1.0,
            })
            .derive(Derived::Scale {
                name: "monthly_turnover",
                column: "daily_sales_rate",
                factor: config.days_per_month,
            })
            .sort_by("daily_sales_rate", Order::Descending),
        ViewSpec::new("category_turnover", "Category Turnover")
            .key("product_category", D::Category)
            .agg("quantity", Sum(M::Quantity))
            .derive(Derived::PerDay {
                name: "turnover_rate",
                column: "quantity",
                scale: config.days_per_month,
            }),
        ViewSpec::new("product_anomaly_stats", "Product Quantity and Price Statistics")
            .key("product_id", D::Product)
            .key("product_name", D::ProductName)
            .key("product_category", D::Category)
            .agg("avg_quantity", Mean(M::Quantity))
            .agg("qty_std", Std(M::Quantity))
            .agg("max_quantity", Max(M::Quantity))
            .agg("avg_price", Mean(M::UnitPrice))
            .agg("price_std", Std(M::UnitPrice))
            .agg("max_price", Max(M::UnitPrice))
            .agg("avg_total", Mean(M::TotalPrice))
            .agg("total_std", Std(M::TotalPrice))
            .agg("max_total", Max(M::TotalPrice)),
    ]
}

// ── Marketing ───────────────────────────────────────────────────────────────

fn marketing_views() -> Vec<ViewSpec> {
    vec![
        ViewSpec::new("discount_impact", "Discount Impact")
            .key("discount_applied", D::Discount)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_sale", Mean(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .agg("customers", Distinct(D::Customer))
            .agg("quantity", Sum(M::Quantity))
            .share("share_of_sales", "total_sales", 0),
        ViewSpec::new("loyalty_discount_response", "Discount Response by Loyalty")
            .key("loyalty_member", D::Loyalty)
            .key("discount_applied", D::Discount)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_sale", Mean(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .share("share_of_segment", "transactions", 1),
    ]
}

// ── Geography ───────────────────────────────────────────────────────────────

fn geographic_views() -> Vec<ViewSpec> {
    vec![
        ViewSpec::new("regional_preferences", "Category Preferences by Store")
            .key("store_location", D::StoreLocation)
            .key("product_category", D::Category)
            .agg("quantity", Sum(M::Quantity))
            .share("share_of_store", "quantity", 1),
        ViewSpec::new("payment_by_region", "Payment Methods by Store")
            .key("store_location", D::StoreLocation)
            .key("payment_method", D::PaymentMethod)
            .agg("transactions", Distinct(D::Transaction))
            .share("share_of_store", "transactions", 1),
        ViewSpec::new("location_types", "Urban vs Suburban")
            .key("location_type", D::LocationType)
            .agg("total_sales", Sum(M::TotalPrice))
            .agg("avg_line_value", Mean(M::TotalPrice))
            .agg("transactions", Distinct(D::Transaction))
            .agg("customers", Distinct(D::Customer))
            .agg("loyalty_rate", Mean(M::Loyalty)),
        ViewSpec::new("price_variation", "Price Variation by Store")
            .key("product_category", D::Category)
            .key("store_location", D::StoreLocation)
            .agg("mean_price", Mean(M::UnitPrice))
            .agg("price_std", Std(M::UnitPrice))
            .derive(Derived::Ratio {
                name: "cv_pct",
                numerator: "price_std",
                denominator: "mean_price",
                scale: 100.0,
            }),
    ]
}

// ── Finance ─────────────────────────────────────────────────────────────────

fn financial_views() -> Vec<ViewSpec> {
    vec![
        margin_view("category_margins", "Margin by Category", "product_category", D::Category),
        margin_view("discount_margins", "Margin by Discount Level", "discount_applied", D::Discount),
        margin_view("daily_margins", "Daily Margin", "date", D::Date),
        margin_view("product_margins", "Margin by Product", "product_name", D::ProductName)
            .sort_by("margin", Order::Descending),
    ]
}
