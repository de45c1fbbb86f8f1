//! grocery-report: loads generated shards and prints report views.
//!
//! Usage:
//!   grocery-report --data output                      metrics + view list
//!   grocery-report --data output --view category_sales
//!   grocery-report --data output --json               everything as JSON
//!   grocery-report --data output --config report.json --prefix grocery_transactions

use anyhow::{Context, Result};
use grocery_core::{
    config::ReportConfig,
    report::Report,
    store::ShardStore,
    table::Table,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = flag_value(&args, "--data").unwrap_or("output");
    let prefix = flag_value(&args, "--prefix").unwrap_or("grocery_transactions");
    let view = flag_value(&args, "--view");
    let json = args.iter().any(|a| a == "--json");

    let config = match flag_value(&args, "--config") {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading report config from {path}"))?,
        None => ReportConfig::default(),
    };

    let dataset = ShardStore::new(data_dir, prefix)
        .load()
        .with_context(|| format!("loading shards from {data_dir}"))?;
    log::info!("report: loaded {} lines from {data_dir}", dataset.len());
    let report = Report::standard(config);

    match (view, json) {
        (Some(name), true) => {
            let table = report.run_view(&dataset, name)?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        (Some(name), false) => {
            let table = report.run_view(&dataset, name)?;
            print_table(&table);
        }
        (None, true) => {
            let output = report.run_all(&dataset)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        (None, false) => {
            let m = report.metrics(&dataset);
            println!("grocery-report: {} lines from {data_dir}", dataset.len());
            println!("  total sales:           {:.2}", m.key.total_sales);
            println!("  transactions:          {}", m.key.transactions);
            println!("  customers:             {}", m.key.customers);
            if let Some(v) = m.key.avg_transaction_value {
                println!("  avg transaction value: {v:.2}");
            }
            println!("  churn risk:            {:.1}%", m.retention.churn_risk_pct);
            if let Some(v) = m.financial.overall_margin_pct {
                println!("  overall margin:        {v:.1}%");
            }
            println!();
            println!("Views (--view NAME):");
            for (name, title) in report.catalog() {
                println!("  {name:<28} {title}");
            }
        }
    }
    Ok(())
}

fn print_table(table: &Table) {
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
