//! Shared primitive types used across the generator and the report core.

/// A stable, unique identifier for a customer (UUID text).
pub type CustomerId = String;

/// A product identifier (`PROD_0001`, `PROD_0002`, ...).
pub type ProductId = String;

/// A stable, unique identifier for a transaction (UUID text).
pub type TransactionId = String;

/// A discount rate expressed as a fraction (0.10 = 10%).
pub type DiscountRate = f64;

/// Round a currency amount to cents, half away from zero.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Express a fractional rate in whole basis points (0.10 -> 1000).
/// Used wherever a rate has to act as an ordered group key.
pub fn rate_to_bps(rate: f64) -> i64 {
    (rate * 10_000.0).round() as i64
}
