// Test doubles shared across module tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::github::{ContentSource, DocumentPath, FileEntry, FileListing, RepoRef};

/// In-memory content source that counts upstream calls.
#[derive(Debug, Default)]
pub struct StubSource {
    documents: HashMap<String, String>,
    listings: HashMap<String, FileListing>,
    document_calls: AtomicUsize,
    listing_calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `markdown` for `owner/repo/ref/path`.
    pub fn with_document(mut self, path: &str, markdown: &str) -> Self {
        self.documents.insert(path.to_string(), markdown.to_string());
        self
    }

    /// Serve a listing of `files` for `owner/repo/ref`.
    pub fn with_listing(mut self, repo: &str, sha: &str, files: &[&str]) -> Self {
        let files = files
            .iter()
            .enumerate()
            .map(|(i, path)| FileEntry {
                path: path.to_string(),
                sha: format!("blob{}", i),
            })
            .collect();
        self.listings.insert(
            repo.to_string(),
            FileListing {
                sha: sha.to_string(),
                files,
            },
        );
        self
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn fetch_document(&self, doc: &DocumentPath) -> Result<String> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/{}/{}/{}",
            doc.repo.owner, doc.repo.repo, doc.repo.reference, doc.path
        );
        self.documents
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound(path))
    }

    async fn fetch_listing(&self, repo: &RepoRef) -> Result<FileListing> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let path = format!("{}/{}/{}", repo.owner, repo.repo, repo.reference);
        self.listings
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound(path))
    }
}
