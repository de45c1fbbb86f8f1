//! ReportView trait and the context every view reads.
//!
//! RULE: Every view implements ReportView.
//! A view is a pure function of the immutable Dataset and the
//! ReportConfig. Views never share mutable state and never call
//! each other; the Report runs them in registration order.

use crate::{config::ReportConfig, dataset::Dataset, error::GroceryResult, table::Table};

/// Everything a view may read.
#[derive(Clone, Copy)]
pub struct ViewContext<'a> {
    pub dataset: &'a Dataset,
    pub config: &'a ReportConfig,
}

impl<'a> ViewContext<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a ReportConfig) -> Self {
        Self { dataset, config }
    }
}

/// The contract every aggregate view must fulfill.
pub trait ReportView {
    /// Unique stable name for this view.
    fn name(&self) -> &'static str;

    /// Human-readable heading for presentation layers.
    fn title(&self) -> &'static str;

    fn compute(&self, ctx: &ViewContext<'_>) -> GroceryResult<Table>;
}
