//! The report runner: a registry of views over one loaded Dataset.
//!
//! EXECUTION ORDER (fixed, registration order):
//!   1. Declarative views from `views::standard_views`
//!   2. Customer segmentation
//!   3. Retention, purchase gaps, at-risk customers, retention by segment
//!   4. Anomaly scan
//!   5. Category affinity
//!
//! RULES:
//!   - Views run in registration order and never see each other's output.
//!   - The Dataset is borrowed immutably for the whole run.
//!   - View names are unique; lookup by an unknown name is an error.

use crate::{
    affinity::CategoryAffinity,
    anomaly::AnomalyScan,
    config::ReportConfig,
    dataset::Dataset,
    error::{GroceryError, GroceryResult},
    metrics::DashboardMetrics,
    retention::{AtRiskCustomers, PurchaseGaps, RetentionAnalysis, RetentionBySegment},
    segmentation::CustomerSegmentation,
    table::Table,
    view::{ReportView, ViewContext},
    views::standard_views,
};
use serde::Serialize;

/// Everything one full report run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub metrics: DashboardMetrics,
    pub views:   Vec<Table>,
}

pub struct Report {
    config: ReportConfig,
    views:  Vec<Box<dyn ReportView>>,
}

impl Report {
    pub fn new(config: ReportConfig) -> Self {
        Self { config, views: Vec::new() }
    }

    /// A report with every standard view registered.
    /// Call this instead of new() + manual register() calls.
    pub fn standard(config: ReportConfig) -> Self {
        let mut report = Report::new(config);
        for spec in standard_views(&report.config) {
            report.register(Box::new(spec));
        }
        report.register(Box::new(CustomerSegmentation));
        report.register(Box::new(RetentionAnalysis));
        report.register(Box::new(PurchaseGaps));
        report.register(Box::new(AtRiskCustomers));
        report.register(Box::new(RetentionBySegment));
        report.register(Box::new(AnomalyScan));
        report.register(Box::new(CategoryAffinity));
        report
    }

    /// Register a view. A view whose name is already taken replaces
    /// the earlier registration in place.
    pub fn register(&mut self, view: Box<dyn ReportView>) {
        match self.views.iter().position(|v| v.name() == view.name()) {
            Some(i) => self.views[i] = view,
            None => self.views.push(view),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.views.iter().map(|v| v.name()).collect()
    }

    /// (name, title) pairs in registration order.
    pub fn catalog(&self) -> Vec<(&'static str, &'static str)> {
        self.views.iter().map(|v| (v.name(), v.title())).collect()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Compute one view by name.
    pub fn run_view(&self, dataset: &Dataset, name: &str) -> GroceryResult<Table> {
        let view = self
            .views
            .iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| GroceryError::UnknownView { name: name.to_string() })?;
        log::debug!("report: computing {}", view.name());
        view.compute(&ViewContext::new(dataset, &self.config))
    }

    /// Compute every registered view in registration order.
    pub fn run(&self, dataset: &Dataset) -> GroceryResult<Vec<Table>> {
        let ctx = ViewContext::new(dataset, &self.config);
        let mut tables = Vec::with_capacity(self.views.len());
        for view in &self.views {
            log::debug!("report: computing {}", view.name());
            tables.push(view.compute(&ctx)?);
        }
        log::info!("report: computed {} views over {} lines", tables.len(), dataset.len());
        Ok(tables)
    }

    pub fn metrics(&self, dataset: &Dataset) -> DashboardMetrics {
        DashboardMetrics::compute(&ViewContext::new(dataset, &self.config))
    }

    /// Metrics plus every view.
    pub fn run_all(&self, dataset: &Dataset) -> GroceryResult<ReportOutput> {
        Ok(ReportOutput {
            metrics: self.metrics(dataset),
            views:   self.run(dataset)?,
        })
    }
}
