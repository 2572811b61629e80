// GitHub content module.
// Client, types, and the content source seam used by the cache-backed service.

pub mod client;
pub mod endpoints;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::GitHubClient;
pub use types::{
    CommitResponse, DocumentPath, FileEntry, FileListing, RepoRef, TreeResponse, is_markdown,
};

/// Upstream that provides raw markdown and file listings.
///
/// A missing or unavailable resource is reported as `Error::NotFound`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_document(&self, doc: &DocumentPath) -> Result<String>;

    async fn fetch_listing(&self, repo: &RepoRef) -> Result<FileListing>;
}

#[async_trait]
impl ContentSource for GitHubClient {
    async fn fetch_document(&self, doc: &DocumentPath) -> Result<String> {
        self.get_raw_file(doc).await
    }

    async fn fetch_listing(&self, repo: &RepoRef) -> Result<FileListing> {
        self.get_markdown_listing(repo).await
    }
}
