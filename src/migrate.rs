use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::record::{Field, FieldKind};

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Create coins table (one column per scalar field)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(source, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Add field columns missing from older databases
    let existing: Vec<String> = sqlx::query("PRAGMA table_info(coins)")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    for field in Field::ALL {
        let column_type = match field.kind() {
            FieldKind::Text => "TEXT",
            FieldKind::Number => "NUMERIC",
            FieldKind::Image => continue,
        };
        if existing.iter().any(|c| c == field.as_str()) {
            continue;
        }
        let sql = format!(
            "ALTER TABLE coins ADD COLUMN \"{}\" {}",
            field.as_str(),
            column_type
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    // Create coin_images table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coin_images (
            coin_id INTEGER NOT NULL,
            field TEXT NOT NULL,
            format TEXT NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            data BLOB NOT NULL,
            PRIMARY KEY (coin_id, field),
            FOREIGN KEY (coin_id) REFERENCES coins(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create import_runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_runs (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            finished_at INTEGER,
            status TEXT NOT NULL,
            items_seen INTEGER NOT NULL DEFAULT 0,
            items_written INTEGER NOT NULL DEFAULT 0,
            detail_failures INTEGER NOT NULL DEFAULT 0,
            image_failures INTEGER NOT NULL DEFAULT 0,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_coins_country ON coins(country)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_import_runs_started_at ON import_runs(started_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
