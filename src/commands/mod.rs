pub mod composite;
pub mod events;
pub mod products;
pub mod reports;
pub mod spoilage;
pub mod stock;
pub mod transactions;

/// Round a money amount to whole cents.
pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
