#![forbid(unsafe_code)]
//! Command-line driver for a hashledger ledger

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use hashledger::cli::{open_chain, parse_assignments};
use hashledger::config::{load_config, DEFAULT_CONFIG_PATH};
use hashledger::Chain;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hashledger", about = "Append-only hash-linked ledger")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a block carrying the given key=value payload
    Add {
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Print every block in the ledger
    Show,
    /// Re-verify every link in the ledger
    Verify,
    /// Append a block record read from a JSON file
    Import { file: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    tracing_subscriber::fmt()
        .with_max_level(config.logging.tracing_level()?)
        .with_writer(std::io::stderr)
        .init();

    let mut chain = open_chain(&config)?;
    if config.database.path.is_none() {
        eprintln!(
            "{}",
            "No database.path configured: this ledger lives only for this run.".yellow()
        );
    }

    match cli.command {
        Command::Add { fields } => {
            let transaction = parse_assignments(&fields)?;
            let block = chain.create_block_from_transaction(transaction)?;
            chain.append(block)?;
            let tip = chain.last_block();
            println!("{} {}", "✅ Appended block".bright_green().bold(), tip.index());
            println!("   {} {}", "hash:".cyan(), tip.hash());
        }
        Command::Show => print_chain(&chain),
        Command::Verify => {
            chain.verify()?;
            println!(
                "{} {} blocks, every link intact",
                "✅ Verified".bright_green().bold(),
                chain.len()
            );
        }
        Command::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            let record: serde_json::Value = serde_json::from_str(&content)?;
            chain.append_value(&record)?;
            println!(
                "{} {}",
                "✅ Imported block".bright_green().bold(),
                chain.last_block().index()
            );
        }
    }

    Ok(())
}

fn print_chain(chain: &Chain) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Index").add_attribute(Attribute::Bold).fg(TableColor::Cyan),
            Cell::new("Time (UTC)").add_attribute(Attribute::Bold).fg(TableColor::Cyan),
            Cell::new("Transaction").add_attribute(Attribute::Bold).fg(TableColor::Cyan),
            Cell::new("Previous Hash").add_attribute(Attribute::Bold).fg(TableColor::Cyan),
            Cell::new("Hash").add_attribute(Attribute::Bold).fg(TableColor::Cyan),
        ]);

    for block in chain {
        let micros = (block.timestamp() * 1_000_000.0) as i64;
        let time = chrono::DateTime::from_timestamp_micros(micros)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| block.timestamp().to_string());

        table.add_row(vec![
            Cell::new(block.index()).fg(TableColor::Yellow),
            Cell::new(time),
            Cell::new(block.transaction().to_string()),
            Cell::new(shorten(block.previous_hash())),
            Cell::new(block.hash()).fg(TableColor::Green),
        ]);
    }

    println!("{}", table);
    println!("{} {}", "Blocks:".bright_cyan().bold(), chain.len());
}

fn shorten(hash: &str) -> String {
    if hash.is_ascii() && hash.len() > 16 {
        format!("{}…{}", &hash[..8], &hash[hash.len() - 8..])
    } else {
        hash.to_string()
    }
}
