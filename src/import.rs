//! Import orchestration.
//!
//! Coordinates the full flow: authorization → token exchange → collection
//! listing → per-item mapping → storage.
//!
//! Failure policy:
//!
//! - Cancelled authorization, a failed token exchange, or a failed
//!   collection page aborts the import. All rows are written in one
//!   transaction, so nothing from an aborted run is committed.
//! - A failed coin detail keeps that item's collection fields; a failed
//!   picture leaves its image field unset. Both are counted and the import
//!   continues.

use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{self, StreamExt};
use sqlx::SqlitePool;

use crate::auth::{self, AuthOutcome, AuthorizationSurface};
use crate::client::NumistaClient;
use crate::collection::CollectionPager;
use crate::config::Config;
use crate::db;
use crate::mapping::{ItemMapper, ItemOutcome};
use crate::migrate;
use crate::models::{AccessToken, CollectedItem};
use crate::progress::{ImportProgressEvent, ImportProgressReporter};
use crate::record::Record;
use crate::store::{self, RunCounts};

/// Source label stored with every imported row.
pub const SOURCE: &str = "numista";

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Authenticate and count items without fetching details or writing.
    pub dry_run: bool,
    /// Stop after this many items.
    pub limit: Option<usize>,
    /// Skip picture downloads regardless of `import.fetch_images`.
    pub no_images: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub items_seen: u64,
    pub items_written: u64,
    pub detail_failures: u64,
    pub images_set: u64,
    pub image_failures: u64,
    pub pages: u32,
}

impl ImportSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        if !outcome.detail_fetched {
            self.detail_failures += 1;
        }
        self.images_set += u64::from(outcome.images_set);
        self.image_failures += u64::from(outcome.image_failures);
    }

    fn counts(&self) -> RunCounts {
        RunCounts {
            items_seen: self.items_seen,
            items_written: self.items_written,
            detail_failures: self.detail_failures,
            image_failures: self.image_failures,
        }
    }
}

/// Authorize through `surface` and exchange the code for a token.
pub async fn connect(
    config: &Config,
    client: &NumistaClient,
    surface: &mut dyn AuthorizationSurface,
) -> Result<AccessToken> {
    let code = match auth::authorize(&config.numista, surface).await? {
        AuthOutcome::Succeeded(code) => code,
        AuthOutcome::Cancelled => bail!("authorization cancelled"),
    };

    let token = client
        .exchange_code(&code)
        .await
        .context("token exchange failed")?;
    tracing::info!(user_id = token.user_id, "authorized");
    Ok(token)
}

/// Page through the collection, map every item, and store it.
///
/// With `pool = None` items are mapped but not written.
pub async fn import_collection(
    config: &Config,
    client: &NumistaClient,
    token: &AccessToken,
    pool: Option<&SqlitePool>,
    options: &ImportOptions,
    reporter: &dyn ImportProgressReporter,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    reporter.report(ImportProgressEvent::Listing {
        source: SOURCE.to_string(),
    });

    let pager = CollectionPager::new(client, token, config.numista.page_size);
    let limit = options.limit.unwrap_or(usize::MAX);

    if options.dry_run {
        let mut pager = pager;
        while summary.items_seen < limit as u64 {
            match pager.next_item().await {
                Ok(Some(_)) => summary.items_seen += 1,
                Ok(None) => break,
                Err(e) => return Err(anyhow!(e).context("failed to fetch collection")),
            }
        }
        summary.pages = pager.pages_fetched();
        return Ok(summary);
    }

    let fetch_images = config.import.fetch_images && !options.no_images;
    let mapper = ItemMapper::new(client, fetch_images);
    let mapper = &mapper;

    let items = stream::unfold(pager, |mut pager| async move {
        let next = pager.next_item().await.transpose()?;
        let total = pager.total_hint();
        let pages = pager.pages_fetched();
        Some(((next, total, pages), pager))
    })
    .take(limit)
    .map(|(next, total, pages)| async move {
        let item: CollectedItem = next?;
        let mut record = Record::new();
        let outcome = mapper.set_record(&mut record, &item).await;
        Ok::<_, crate::error::CatalogError>((item, record, outcome, total, pages))
    })
    .buffered(config.import.concurrency);
    futures::pin_mut!(items);

    let mut tx = match pool {
        Some(pool) => Some(pool.begin().await?),
        None => None,
    };

    while let Some(mapped) = items.next().await {
        let (item, record, outcome, total, pages) =
            mapped.map_err(|e| anyhow!(e).context("failed to fetch collection"))?;
        summary.items_seen += 1;
        summary.pages = pages;
        summary.record(outcome);

        if let Some(tx) = tx.as_mut() {
            store::upsert_record(tx, SOURCE, &item.source_id(), &record)
                .await
                .with_context(|| format!("failed to store coin {}", item.coin.id))?;
            summary.items_written += 1;
        }

        reporter.report(ImportProgressEvent::Importing {
            source: SOURCE.to_string(),
            n: summary.items_seen,
            total,
        });
    }

    if let Some(tx) = tx {
        tx.commit().await?;
    }

    Ok(summary)
}

/// CLI entry point: full import into the configured database.
pub async fn run_import(
    config: &Config,
    surface: &mut dyn AuthorizationSurface,
    options: &ImportOptions,
    reporter: &dyn ImportProgressReporter,
) -> Result<ImportSummary> {
    let client = NumistaClient::new(&config.numista)?;

    // A dry run never opens the database.
    let pool = if options.dry_run {
        None
    } else {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Some(pool)
    };

    let run_id = match &pool {
        Some(pool) => Some(store::start_run(pool, SOURCE).await?),
        None => None,
    };

    reporter.report(ImportProgressEvent::Authorizing {
        source: SOURCE.to_string(),
    });
    let result = match connect(config, &client, surface).await {
        Ok(token) => {
            import_collection(config, &client, &token, pool.as_ref(), options, reporter).await
        }
        Err(e) => Err(e),
    };

    if let Some(pool) = pool {
        if let Some(run_id) = &run_id {
            let (counts, error) = match &result {
                Ok(summary) => (summary.counts(), None),
                Err(e) => (RunCounts::default(), Some(format!("{:#}", e))),
            };
            store::finish_run(&pool, run_id, counts, error.as_deref()).await?;
        }
        pool.close().await;
    }

    let summary = result?;
    print_summary(&summary, options);
    Ok(summary)
}

fn print_summary(summary: &ImportSummary, options: &ImportOptions) {
    if options.dry_run {
        println!("import {} (dry-run)", SOURCE);
        println!("  items found: {}", summary.items_seen);
        println!("  pages: {}", summary.pages);
        return;
    }
    println!("import {}", SOURCE);
    println!("  items: {}", summary.items_seen);
    println!("  written: {}", summary.items_written);
    println!("  images: {}", summary.images_set);
    println!("  detail failures: {}", summary.detail_failures);
    println!("  image failures: {}", summary.image_failures);
    println!("ok");
}
