//! Fixture helpers shared by the unit test modules.

use crate::dataset::{datetime_format, Dataset, TransactionLine};

/// A Downtown, cash, non-loyalty line with a correctly computed total.
#[allow(clippy::too_many_arguments)]
pub fn line(
    transaction_id: &str,
    customer_id: &str,
    ts: &str,
    product_id: &str,
    category: &str,
    quantity: u32,
    unit_price: f64,
    discount: f64,
) -> TransactionLine {
    TransactionLine {
        transaction_id: transaction_id.into(),
        customer_id: customer_id.into(),
        transaction_datetime: datetime_format::parse(ts).unwrap(),
        store_location: "Downtown".into(),
        product_id: product_id.into(),
        product_name: format!("{product_id} name"),
        product_category: category.into(),
        quantity,
        unit_price,
        total_price: TransactionLine::expected_total(quantity, unit_price, discount),
        payment_method: "Cash".into(),
        loyalty_member: false,
        discount_applied: discount,
    }
}

/// Three customers, four transactions, two categories, two stores.
pub fn small_dataset() -> Dataset {
    let mut lines = vec![
        line("t1", "c1", "2023-01-02 09:00:00", "P1", "Dairy", 2, 5.00, 0.0),
        line("t1", "c1", "2023-01-02 09:00:00", "P2", "Snacks", 1, 3.00, 0.0),
        line("t2", "c2", "2023-01-02 15:30:00", "P1", "Dairy", 4, 5.00, 0.10),
        line("t3", "c1", "2023-04-10 11:00:00", "P2", "Snacks", 3, 3.00, 0.0),
        line("t4", "c3", "2023-04-11 18:45:00", "P1", "Dairy", 1, 5.00, 0.05),
    ];
    lines[2].loyalty_member = true;
    lines[2].store_location = "Suburb North".into();
    lines[4].store_location = "Coastal".into();
    lines[4].payment_method = "Credit Card".into();
    Dataset::new(lines).unwrap()
}
