//! grocery-core: seeded grocery transaction generator and the
//! aggregation layer that reports over its output.
//!
//! Generation: config → population → transaction → partition/store.
//! Reporting:  store → dataset → aggregate/views + bespoke views → report.

pub mod affinity;
pub mod aggregate;
pub mod anomaly;
pub mod calendar;
pub mod config;
pub mod dataset;
pub mod error;
pub mod finance;
pub mod generator;
pub mod metrics;
pub mod name_generator;
pub mod partition;
pub mod population;
pub mod report;
pub mod retention;
pub mod rng;
pub mod segmentation;
pub mod store;
pub mod table;
pub mod transaction;
pub mod types;
pub mod view;
pub mod views;

#[cfg(test)]
mod testing;
