//! grocery-gen: headless runner for the synthetic transaction generator.
//!
//! Usage:
//!   grocery-gen --seed 42 --transactions 100000 --files 10 --out output
//!   grocery-gen --config generator.json --seed 7

use anyhow::{anyhow, Context, Result};
use grocery_core::{config::GeneratorConfig, generator::DatasetGenerator};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match flag_value(&args, "--config") {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading generator config from {path}"))?,
        None => GeneratorConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed)?;
    config.total_transactions = parse_arg(&args, "--transactions", config.total_transactions)?;
    config.total_customers = parse_arg(&args, "--customers", config.total_customers)?;
    config.total_products = parse_arg(&args, "--products", config.total_products)?;
    config.files_to_split = parse_arg(&args, "--files", config.files_to_split)?;
    if let Some(out) = flag_value(&args, "--out") {
        config.output_dir = out.to_string();
    }

    println!("grocery-gen");
    println!("  seed:          {}", config.seed);
    println!("  transactions:  {}", config.total_transactions);
    println!("  customers:     {}", config.total_customers);
    println!("  products:      {}", config.total_products);
    println!("  files:         {}", config.files_to_split);
    println!("  out:           {}", config.output_dir);
    println!();

    let generator = DatasetGenerator::build(config)?;
    let summary = generator.run()?;

    println!("Generated {} transactions ({} lines)", summary.transactions, summary.lines);
    println!("  loyalty customers:     {}", summary.loyalty_customers);
    println!("  high-demand products:  {}", summary.high_demand_products);
    println!("  total sales:           {:.2}", summary.total_sales);
    for file in &summary.files {
        println!("  wrote {}", file.display());
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Value following `flag`, or `default` when the flag is absent.
/// A present but unparseable value is an error.
fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> Result<T> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow!("invalid value for {flag}: {raw:?}")),
        None => Ok(default),
    }
}
