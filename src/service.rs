// Cache-backed content operations.
// Joins the content source and the markdown pipeline behind the SWR cache.

use std::sync::Arc;

use crate::cache::{CacheStatus, Payload, SwrCache};
use crate::error::{Error, Result};
use crate::github::{ContentSource, DocumentPath, FileListing, RepoRef};
use crate::markdown::{self, Document};

pub struct ContentService {
    cache: SwrCache,
    source: Arc<dyn ContentSource>,
}

impl ContentService {
    pub fn new(cache: SwrCache, source: Arc<dyn ContentSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &SwrCache {
        &self.cache
    }

    /// Rendered document for a file, served through the cache.
    pub async fn document(
        &self,
        doc: DocumentPath,
        bypass: bool,
    ) -> Result<(Document, CacheStatus)> {
        let key = doc.cache_key();
        let source = Arc::clone(&self.source);

        let served = self
            .cache
            .serve(&key, bypass, move || async move {
                let raw = source.fetch_document(&doc).await?;
                let document = markdown::transform(&raw)?;
                Ok(Payload::Document(document))
            })
            .await?;

        match served.payload {
            Payload::Document(document) => Ok((document, served.status)),
            Payload::Listing(_) => Err(Error::Other(format!(
                "cache entry {} is not a document",
                key
            ))),
        }
    }

    /// Markdown file listing for a revision, served through the cache.
    pub async fn listing(&self, repo: RepoRef, bypass: bool) -> Result<(FileListing, CacheStatus)> {
        let key = repo.listing_key();
        let source = Arc::clone(&self.source);

        let served = self
            .cache
            .serve(&key, bypass, move || async move {
                let listing = source.fetch_listing(&repo).await?;
                Ok(Payload::Listing(listing))
            })
            .await?;

        match served.payload {
            Payload::Listing(listing) => Ok((listing, served.status)),
            Payload::Document(_) => Err(Error::Other(format!(
                "cache entry {} is not a listing",
                key
            ))),
        }
    }
}
