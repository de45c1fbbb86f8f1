//! Deterministic product naming from the per-category name pools.
//!
//! All generation is deterministic (same RNG seed = same names).

use crate::{config::CategoryConfig, rng::StreamRng};

/// Deterministic name generator over curated category pools.
pub struct NameGenerator;

impl NameGenerator {
    /// Product identifier for the product at zero-based creation `index`.
    pub fn product_id(index: usize) -> String {
        format!("PROD_{:04}", index + 1)
    }

    /// Pick a pool item and suffix it with the one-based creation index,
    /// e.g. "Greek Yogurt 17".
    pub fn product_name(category: &CategoryConfig, index: usize, rng: &mut StreamRng) -> String {
        let base = &category.items[rng.pick_index(category.items.len())];
        format!("{} {}", base, index + 1)
    }
}
