//! Lazy walk over the user's collected coins.
//!
//! [`CollectionPager`] hands out [`CollectedItem`]s one at a time and only
//! requests the next page when the current one is used up. With a page
//! size of `0` it makes exactly one request for the whole collection.
//! The sequence is finite and cannot be restarted; an error ends it.

use std::collections::VecDeque;

use crate::client::NumistaClient;
use crate::error::CatalogError;
use crate::models::{AccessToken, CollectedItem};

pub struct CollectionPager<'a> {
    client: &'a NumistaClient,
    token: &'a AccessToken,
    page_size: u32,
    next_page: u32,
    buffer: VecDeque<CollectedItem>,
    yielded: u64,
    total: Option<u64>,
    pages_fetched: u32,
    /// Key of the first item on the previous page.
    last_page_head: Option<String>,
    exhausted: bool,
}

impl<'a> CollectionPager<'a> {
    pub fn new(client: &'a NumistaClient, token: &'a AccessToken, page_size: u32) -> Self {
        Self {
            client,
            token,
            page_size,
            next_page: 1,
            buffer: VecDeque::new(),
            yielded: 0,
            total: None,
            pages_fetched: 0,
            last_page_head: None,
            exhausted: false,
        }
    }

    /// Total number of items, once the API has reported it.
    pub fn total_hint(&self) -> Option<u64> {
        self.total
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Next item, fetching another page when needed.
    pub async fn next_item(&mut self) -> Result<Option<CollectedItem>, CatalogError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }
            if let Err(e) = self.fetch_next_page().await {
                self.exhausted = true;
                return Err(e);
            }
        }
    }

    /// Drain the remaining items into a vector.
    pub async fn collect_all(mut self) -> Result<Vec<CollectedItem>, CatalogError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_next_page(&mut self) -> Result<(), CatalogError> {
        if self.page_size == 0 {
            let page = self.client.fetch_collection_page(self.token, None).await?;
            self.pages_fetched += 1;
            self.total = Some(page.item_count.unwrap_or(page.collected_coins.len() as u64));
            self.buffer.extend(page.collected_coins);
            self.exhausted = true;
            return Ok(());
        }

        let page = self
            .client
            .fetch_collection_page(self.token, Some((self.next_page, self.page_size)))
            .await?;
        self.pages_fetched += 1;
        self.next_page += 1;

        let received = page.collected_coins.len() as u64;
        let head = page.collected_coins.first().map(CollectedItem::source_id);

        // An endpoint that ignores paging answers every page with the same list.
        if head.is_some() && head == self.last_page_head {
            tracing::warn!(
                page = self.next_page - 1,
                "collection page repeats the previous one; paging parameters ignored"
            );
            self.exhausted = true;
            self.total = Some(self.yielded + self.buffer.len() as u64);
            return Ok(());
        }
        self.last_page_head = head;

        if page.item_count.is_some() {
            self.total = page.item_count;
        }
        self.buffer.extend(page.collected_coins);

        let seen = self.yielded + self.buffer.len() as u64;
        let reached_total = self.total.is_some_and(|total| seen >= total);
        // More than asked for means the whole collection came back at once.
        let unpaged = received > u64::from(self.page_size);
        if received < u64::from(self.page_size) || reached_total || unpaged {
            self.exhausted = true;
            self.total.get_or_insert(seen);
        }

        tracing::debug!(
            page = self.next_page - 1,
            received,
            total = ?self.total,
            "collection page fetched"
        );
        Ok(())
    }
}
