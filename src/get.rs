//! Coin retrieval by id.
//!
//! Prints every stored field of one imported coin. Pictures are shown as
//! a short description rather than raw bytes.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::store::{self, StoredCoin};

/// Core get function returning structured data.
pub async fn get_coin(config: &Config, id: i64) -> Result<StoredCoin> {
    let pool = db::connect(config).await?;
    let coin = store::load_coin(&pool, id).await;
    pool.close().await;

    match coin? {
        Some(coin) => Ok(coin),
        None => bail!("coin not found: {}", id),
    }
}

/// CLI entry point: calls get_coin and prints to stdout.
pub async fn run_get(config: &Config, id: i64) -> Result<()> {
    let coin = get_coin(config, id).await?;

    println!("--- Coin ---");
    println!("id:         {}", coin.id);
    println!("source:     {}", coin.source);
    println!("source_id:  {}", coin.source_id);
    println!("created_at: {}", format_ts_iso(coin.created_at));
    println!("updated_at: {}", format_ts_iso(coin.updated_at));
    println!();

    println!("--- Fields ({}) ---", coin.record.len());
    for (field, value) in coin.record.iter() {
        let shown = value.to_string();
        if shown.contains('\n') {
            println!("{}:", field);
            for line in shown.lines() {
                println!("    {}", line);
            }
        } else {
            println!("{:<16} {}", format!("{}:", field), shown);
        }
    }

    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
