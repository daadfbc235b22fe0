//! Cursor-driven object listing
//!
//! [`ObjectPager`] fetches one page per call and keeps the `startAt` cursor
//! from each page's `next` link, so a caller can stop early, read the cursor
//! and resume later with a fresh pager.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::aps::types::{ListQuery, ObjectDetails};
use crate::aps::{ApsError, ObjectStorage};
use crate::error::{GatewayError, Result};

/// Extract the `startAt` token from a listing's `next` link
pub fn start_at_from_next(next: &str) -> std::result::Result<String, ApsError> {
    let url = Url::parse(next)
        .map_err(|e| ApsError::InvalidResponse(format!("bad next link '{next}': {e}")))?;

    url.query_pairs()
        .find(|(name, _)| name == "startAt")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| ApsError::InvalidResponse(format!("next link '{next}' has no startAt")))
}

pub struct ObjectPager {
    storage: Arc<dyn ObjectStorage>,
    token: String,
    bucket: String,
    page_size: u32,
    begins_with: Option<String>,
    cursor: Option<String>,
    pages_fetched: usize,
    done: bool,
}

impl ObjectPager {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        token: impl Into<String>,
        bucket: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            storage,
            token: token.into(),
            bucket: bucket.into(),
            page_size,
            begins_with: None,
            cursor: None,
            pages_fetched: 0,
            done: false,
        }
    }

    /// Only list keys starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.begins_with = Some(prefix.into());
        self
    }

    /// Continue a listing from a cursor obtained earlier
    pub fn resume(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self.done = false;
        self
    }

    /// Cursor of the next page, if one is pending
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the listing is exhausted
    pub async fn next_page(&mut self) -> std::result::Result<Option<Vec<ObjectDetails>>, ApsError> {
        if self.done {
            return Ok(None);
        }

        let query = ListQuery {
            limit: self.page_size,
            start_at: self.cursor.clone(),
            begins_with: self.begins_with.clone(),
        };
        let page = self
            .storage
            .list_objects(&self.token, &self.bucket, &query)
            .await?;
        self.pages_fetched += 1;

        match page.next {
            Some(ref next) => self.cursor = Some(start_at_from_next(next)?),
            None => {
                self.cursor = None;
                self.done = true;
            }
        }

        debug!(
            bucket = %self.bucket,
            items = page.items.len(),
            page = self.pages_fetched,
            more = !self.done,
            "Fetched listing page"
        );

        Ok(Some(page.items))
    }

    /// Drain every remaining page, in arrival order, failing past `max_pages`
    pub async fn collect_all(mut self, max_pages: usize) -> Result<Vec<ObjectDetails>> {
        let mut objects = Vec::new();
        while let Some(items) = self.next_page().await? {
            objects.extend(items);
            if !self.done && self.pages_fetched >= max_pages {
                return Err(GatewayError::PageLimitExceeded {
                    bucket: self.bucket,
                    max_pages,
                });
            }
        }
        Ok(objects)
    }
}
