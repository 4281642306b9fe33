//! # Ledger Audit
//!
//! Checks every frame's cached quantity and batches against its ledger and
//! prints any findings. Exits with status 1 when a frame is inconsistent.
//!
//! ## Usage
//! ```bash
//! cargo run -p jazzy-db --bin audit
//! cargo run -p jazzy-db --bin audit -- --db ./data/jazzy.db
//! cargo run -p jazzy-db --bin audit -- --json
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use jazzy_core::SystemClock;
use jazzy_db::telemetry::init_tracing;
use jazzy_db::{AppConfig, Database, InventoryEngine};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AppConfig::from_env();
    let mut json = false;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--json" => json = true,
            "--help" | "-h" => {
                println!("Jazzy Eyes Ledger Audit");
                println!();
                println!("Usage: audit [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $JAZZY_DB_PATH or ./jazzy.db)");
                println!("      --json         Print the full audit as JSON");
                println!("  -h, --help         Show this help message");
                return Ok(ExitCode::SUCCESS);
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(config.db_config()).await?;
    let engine = InventoryEngine::new(db.clone(), &config, Arc::new(SystemClock)).await?;

    let audits = engine.audit_all().await?;
    let inconsistent: Vec<_> = audits.iter().filter(|a| !a.is_consistent()).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&audits)?);
    } else {
        println!("Audited {} frames", audits.len());
        for audit in &inconsistent {
            println!();
            println!(
                "✗ {} (cached {}, ledger {}, open batches {}, {} entries)",
                audit.frame_id,
                audit.cached_qty,
                audit.ledger_qty,
                audit.batch_remaining,
                audit.entry_count
            );
            for finding in &audit.findings {
                println!("    {:?}", finding);
            }
        }
        println!();
        if inconsistent.is_empty() {
            println!("✓ All ledgers consistent");
        } else {
            println!("⚠ {} inconsistent frames", inconsistent.len());
        }
    }

    db.close().await;

    if inconsistent.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
