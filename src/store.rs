//! SQLite destination store.
//!
//! Imported rows live in `coins` (one column per scalar [`Field`]) and
//! their pictures in `coin_images`. Writes are upserts keyed on
//! `(source, source_id)` and touch only the fields present on the
//! [`Record`], so anything an import did not set keeps its stored value.

use anyhow::Result;
use sqlx::{Row, SqliteConnection, SqlitePool, TypeInfo, ValueRef};

use crate::images::CoinImage;
use crate::record::{Field, FieldKind, FieldValue, Record, RecordSink};

/// A coin row read back from the store.
#[derive(Debug, Clone)]
pub struct StoredCoin {
    pub id: i64,
    pub source: String,
    pub source_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub record: Record,
}

/// Compact listing row.
#[derive(Debug, Clone)]
pub struct CoinSummary {
    pub id: i64,
    pub title: Option<String>,
    pub country: Option<String>,
    pub year: Option<String>,
    pub status: Option<String>,
    pub image_count: i64,
}

/// Counters persisted for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub items_seen: u64,
    pub items_written: u64,
    pub detail_failures: u64,
    pub image_failures: u64,
}

/// Insert or update the coin identified by `(source, source_id)`.
///
/// Runs on the caller's connection so a whole import can share one
/// transaction. Returns the row id.
pub async fn upsert_record(
    conn: &mut SqliteConnection,
    source: &str,
    source_id: &str,
    record: &Record,
) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let scalars: Vec<(Field, &FieldValue)> = record
        .iter()
        .filter(|(field, _)| field.kind() != FieldKind::Image)
        .collect();

    let mut columns = String::from("source, source_id, created_at, updated_at");
    let mut placeholders = String::from("?, ?, ?, ?");
    let mut updates = String::from("updated_at = excluded.updated_at");
    for (field, _) in &scalars {
        columns.push_str(&format!(", \"{}\"", field.as_str()));
        placeholders.push_str(", ?");
        updates.push_str(&format!(", \"{0}\" = excluded.\"{0}\"", field.as_str()));
    }
    let sql = format!(
        "INSERT INTO coins ({}) VALUES ({}) ON CONFLICT(source, source_id) DO UPDATE SET {}",
        columns, placeholders, updates
    );

    let mut query = sqlx::query(&sql)
        .bind(source)
        .bind(source_id)
        .bind(now)
        .bind(now);
    for (_, value) in &scalars {
        query = match value {
            FieldValue::Text(s) => query.bind(s.as_str()),
            FieldValue::Integer(i) => query.bind(*i),
            FieldValue::Real(r) => query.bind(*r),
            FieldValue::Image(_) => query,
        };
    }
    query.execute(&mut *conn).await?;

    let coin_id: i64 = sqlx::query_scalar("SELECT id FROM coins WHERE source = ? AND source_id = ?")
        .bind(source)
        .bind(source_id)
        .fetch_one(&mut *conn)
        .await?;

    for (field, value) in record.iter() {
        let FieldValue::Image(image) = value else {
            continue;
        };
        sqlx::query(
            r#"
            INSERT INTO coin_images (coin_id, field, format, width, height, data)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(coin_id, field) DO UPDATE SET
                format = excluded.format,
                width = excluded.width,
                height = excluded.height,
                data = excluded.data
            "#,
        )
        .bind(coin_id)
        .bind(field.as_str())
        .bind(image.format_name())
        .bind(image.width as i64)
        .bind(image.height as i64)
        .bind(image.data.as_slice())
        .execute(&mut *conn)
        .await?;
    }

    Ok(coin_id)
}

/// Load one coin with every stored field and picture.
pub async fn load_coin(pool: &SqlitePool, id: i64) -> Result<Option<StoredCoin>> {
    let row = match sqlx::query("SELECT * FROM coins WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
    {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut record = Record::new();
    for field in Field::ALL {
        if field.kind() == FieldKind::Image {
            continue;
        }
        let name = field.as_str();
        let storage = {
            let raw = match row.try_get_raw(name) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            if raw.is_null() {
                continue;
            }
            raw.type_info().name().to_string()
        };
        let value = match storage.as_str() {
            "INTEGER" => FieldValue::Integer(row.try_get(name)?),
            "REAL" => FieldValue::Real(row.try_get(name)?),
            _ => FieldValue::Text(row.try_get(name)?),
        };
        record.set_value(*field, value);
    }

    let images = sqlx::query("SELECT field, width, height, data FROM coin_images WHERE coin_id = ?")
        .bind(id)
        .fetch_all(pool)
        .await?;
    for image_row in images {
        let field_name: String = image_row.get("field");
        let Some(field) = Field::from_name(&field_name) else {
            continue;
        };
        let width: i64 = image_row.get("width");
        let height: i64 = image_row.get("height");
        let data: Vec<u8> = image_row.get("data");
        if let Some(image) = CoinImage::from_stored(data, width as u32, height as u32) {
            record.set_value(field, FieldValue::Image(image));
        }
    }

    Ok(Some(StoredCoin {
        id: row.get("id"),
        source: row.get("source"),
        source_id: row.get("source_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        record,
    }))
}

/// List coins in insertion order.
pub async fn list_coins(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<CoinSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT
            c.id,
            c.title,
            c.country,
            CAST(c.year AS TEXT) AS year,
            c.status,
            (SELECT COUNT(*) FROM coin_images i WHERE i.coin_id = c.id) AS image_count
        FROM coins c
        ORDER BY c.id ASC
        LIMIT ?
        "#,
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| CoinSummary {
            id: row.get("id"),
            title: row.get("title"),
            country: row.get("country"),
            year: row.get("year"),
            status: row.get("status"),
            image_count: row.get("image_count"),
        })
        .collect())
}

pub async fn count_coins(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM coins")
        .fetch_one(pool)
        .await?)
}

/// Open an `import_runs` row and return its id.
pub async fn start_run(pool: &SqlitePool, source: &str) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO import_runs (id, source, started_at, status) VALUES (?, ?, ?, 'running')")
        .bind(&id)
        .bind(source)
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await?;
    Ok(id)
}

/// Close an import run with its final counters.
pub async fn finish_run(
    pool: &SqlitePool,
    run_id: &str,
    counts: RunCounts,
    error: Option<&str>,
) -> Result<()> {
    let status = if error.is_some() { "failed" } else { "ok" };
    sqlx::query(
        r#"
        UPDATE import_runs SET
            finished_at = ?,
            status = ?,
            items_seen = ?,
            items_written = ?,
            detail_failures = ?,
            image_failures = ?,
            error = ?
        WHERE id = ?
        "#,
    )
    .bind(chrono::Utc::now().timestamp())
    .bind(status)
    .bind(counts.items_seen as i64)
    .bind(counts.items_written as i64)
    .bind(counts.detail_failures as i64)
    .bind(counts.image_failures as i64)
    .bind(error)
    .bind(run_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::migrate_pool;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate_pool(&pool).await.unwrap();
        pool
    }

    fn png() -> CoinImage {
        use image::{ImageBuffer, ImageFormat, Rgb};
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 3, Rgb([9, 9, 9]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        CoinImage::decode(out.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_load() {
        let pool = memory_pool().await;
        let mut record = Record::new();
        record.set_value(Field::Title, "2 Euro".into());
        record.set_value(Field::Year, FieldValue::Integer(2002));
        record.set_value(Field::Weight, FieldValue::Real(8.5));
        record.set_value(Field::Fineness, "925".into());
        record.set_value(Field::ObverseImg, FieldValue::Image(png()));

        let id = upsert_record(&mut pool.acquire().await.unwrap(), "numista", "1", &record).await.unwrap();
        let coin = load_coin(&pool, id).await.unwrap().unwrap();

        assert_eq!(coin.source_id, "1");
        assert_eq!(coin.record.text(Field::Title), Some("2 Euro"));
        assert_eq!(coin.record.get(Field::Year), Some(&FieldValue::Integer(2002)));
        assert_eq!(coin.record.get(Field::Weight), Some(&FieldValue::Real(8.5)));
        assert_eq!(coin.record.text(Field::Fineness), Some("925"));
        let image = coin
            .record
            .get(Field::ObverseImg)
            .and_then(FieldValue::as_image)
            .unwrap();
        assert_eq!((image.width, image.height), (4, 3));
    }

    #[tokio::test]
    async fn second_upsert_keeps_unset_fields() {
        let pool = memory_pool().await;
        let mut first = Record::new();
        first.set_value(Field::Title, "1 Franc".into());
        first.set_value(Field::Material, "Silver".into());
        let id = upsert_record(&mut pool.acquire().await.unwrap(), "numista", "7", &first).await.unwrap();

        let mut second = Record::new();
        second.set_value(Field::Title, "1 Franc Semeuse".into());
        let id2 = upsert_record(&mut pool.acquire().await.unwrap(), "numista", "7", &second).await.unwrap();

        assert_eq!(id, id2);
        assert_eq!(count_coins(&pool).await.unwrap(), 1);
        let coin = load_coin(&pool, id).await.unwrap().unwrap();
        assert_eq!(coin.record.text(Field::Title), Some("1 Franc Semeuse"));
        assert_eq!(coin.record.text(Field::Material), Some("Silver"));
    }

    #[tokio::test]
    async fn empty_text_year_survives() {
        let pool = memory_pool().await;
        let mut record = Record::new();
        record.set_value(Field::Year, "".into());
        let id = upsert_record(&mut pool.acquire().await.unwrap(), "numista", "x", &record).await.unwrap();
        let coin = load_coin(&pool, id).await.unwrap().unwrap();
        assert_eq!(coin.record.text(Field::Year), Some(""));
    }

    #[tokio::test]
    async fn list_reports_titles_and_images() {
        let pool = memory_pool().await;
        for (n, title) in ["A", "B", "C"].iter().enumerate() {
            let mut record = Record::new();
            record.set_value(Field::Title, (*title).into());
            record.set_value(Field::Year, FieldValue::Integer(1900 + n as i64));
            if n == 0 {
                record.set_value(Field::EdgeImg, FieldValue::Image(png()));
            }
            upsert_record(&mut pool.acquire().await.unwrap(), "numista", &n.to_string(), &record)
                .await
                .unwrap();
        }

        let all = list_coins(&pool, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title.as_deref(), Some("A"));
        assert_eq!(all[0].year.as_deref(), Some("1900"));
        assert_eq!(all[0].image_count, 1);
        assert_eq!(all[1].image_count, 0);

        let two = list_coins(&pool, Some(2)).await.unwrap();
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn missing_coin_is_none() {
        let pool = memory_pool().await;
        assert!(load_coin(&pool, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_bookkeeping() {
        let pool = memory_pool().await;
        let run = start_run(&pool, "numista").await.unwrap();
        let counts = RunCounts {
            items_seen: 2,
            items_written: 2,
            detail_failures: 1,
            image_failures: 0,
        };
        finish_run(&pool, &run, counts, None).await.unwrap();

        let row = sqlx::query("SELECT status, items_seen, detail_failures FROM import_runs WHERE id = ?")
            .bind(&run)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("status"), "ok");
        assert_eq!(row.get::<i64, _>("items_seen"), 2);
        assert_eq!(row.get::<i64, _>("detail_failures"), 1);
    }
}
