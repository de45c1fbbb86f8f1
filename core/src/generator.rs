//! The dataset generator: the whole synthetic run in one pass.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Validate configuration (fail fast, nothing generated)
//!   2. Customer catalog      (customer stream)
//!   3. Product catalog       (product stream)
//!   4. Transactions          (transaction stream)
//!   5. Flatten to lines
//!   6. Shard and write       (store)
//!
//! RULES:
//!   - All randomness flows through the RngBank.
//!   - Catalogs are immutable once built.
//!   - Any failure aborts the run; nothing is retried.

use crate::{
    config::GeneratorConfig,
    dataset::TransactionLine,
    error::GroceryResult,
    population::{generate_customers, generate_products, CustomerRecord, ProductCatalog},
    rng::{RngBank, StreamSlot},
    store::ShardStore,
    transaction::{Transaction, TransactionSynthesizer},
};
use serde::Serialize;
use std::path::PathBuf;

pub struct DatasetGenerator {
    pub config: GeneratorConfig,
    pub rng_bank: RngBank,
    customers: Vec<CustomerRecord>,
    catalog: ProductCatalog,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub transactions: usize,
    pub lines: usize,
    pub loyalty_customers: usize,
    pub high_demand_products: usize,
    pub total_sales: f64,
    pub files: Vec<PathBuf>,
}

impl DatasetGenerator {
    /// Validate the configuration and build both catalogs.
    pub fn build(config: GeneratorConfig) -> GroceryResult<Self> {
        config.validate()?;
        let rng_bank = RngBank::new(config.seed);

        log::info!("generator: generating customer data...");
        let customers = generate_customers(&config, &mut rng_bank.for_stream(StreamSlot::Customer));
        log::info!("generator: generating product data...");
        let catalog = generate_products(&config, &mut rng_bank.for_stream(StreamSlot::Product));

        Ok(Self {
            config,
            rng_bank,
            customers,
            catalog,
        })
    }

    pub fn build_test(seed: u64) -> GroceryResult<Self> {
        Self::build(GeneratorConfig {
            seed,
            ..GeneratorConfig::default_test()
        })
    }

    pub fn customers(&self) -> &[CustomerRecord] {
        &self.customers
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Synthesize every transaction. The transaction stream restarts
    /// from the seed on each call, so repeated calls agree.
    pub fn generate_transactions(&self) -> Vec<Transaction> {
        let total = self.config.total_transactions;
        let synth = TransactionSynthesizer::new(&self.config, &self.customers, &self.catalog);
        let mut rng = self.rng_bank.for_stream(StreamSlot::Transaction);

        log::info!("generator: generating {total} transactions...");
        let interval = self.config.progress_interval.max(1);
        let mut transactions = Vec::with_capacity(total);
        for i in 0..total {
            if i % interval == 0 {
                log::info!("generator: generated {i} transactions...");
            }
            transactions.push(synth.synthesize(&mut rng));
        }
        transactions
    }

    /// Flatten transactions into lines, preserving generation order.
    pub fn flatten(&self, transactions: &[Transaction]) -> Vec<TransactionLine> {
        transactions
            .iter()
            .flat_map(|t| t.flatten(&self.catalog))
            .collect()
    }

    /// Full run: synthesize, flatten, and shard to `config.output_dir`.
    pub fn run(&self) -> GroceryResult<RunSummary> {
        let store = ShardStore::new(&self.config.output_dir, &self.config.file_prefix);
        self.run_into(&store)
    }

    pub fn run_into(&self, store: &ShardStore) -> GroceryResult<RunSummary> {
        let transactions = self.generate_transactions();
        let lines = self.flatten(&transactions);
        let files = store.write_shards(&lines, self.config.files_to_split)?;

        let summary = RunSummary {
            seed: self.config.seed,
            transactions: transactions.len(),
            lines: lines.len(),
            loyalty_customers: self.customers.iter().filter(|c| c.is_loyalty).count(),
            high_demand_products: self.catalog.high_demand_indices().len(),
            total_sales: lines.iter().map(|l| l.total_price).sum(),
            files,
        };
        log::info!(
            "generator: data generation completed ({} transactions, {} lines)",
            summary.transactions,
            summary.lines
        );
        Ok(summary)
    }
}
