//! Listing of imported coins.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store;

pub async fn run_list(config: &Config, limit: Option<i64>) -> Result<()> {
    let pool = db::connect(config).await?;
    let total = store::count_coins(&pool).await?;
    let coins = store::list_coins(&pool, limit).await?;
    pool.close().await;

    if coins.is_empty() {
        println!("No coins imported yet.");
        return Ok(());
    }

    println!(
        "{:<6} {:<40} {:<20} {:<6} {:<6} IMAGES",
        "ID", "TITLE", "COUNTRY", "YEAR", "STATUS"
    );
    for coin in &coins {
        println!(
            "{:<6} {:<40} {:<20} {:<6} {:<6} {}",
            coin.id,
            truncate(coin.title.as_deref().unwrap_or("-"), 40),
            truncate(coin.country.as_deref().unwrap_or("-"), 20),
            coin.year.as_deref().filter(|y| !y.is_empty()).unwrap_or("-"),
            coin.status.as_deref().unwrap_or("-"),
            coin.image_count
        );
    }
    println!();
    println!("{} of {} coins", coins.len(), total);

    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
