// Cache entries and the stores that hold them.
// Entries carry their own staleness and expiry deadlines; stores only persist them.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::github::FileListing;
use crate::markdown::Document;

use super::paths::entry_file_name;

/// Default revalidate window: 5 minutes.
pub const DEFAULT_REVALIDATE: Duration = Duration::from_secs(5 * 60);

/// Default time an entry stays servable: 2 days.
pub const DEFAULT_STALE_FOR: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Freshness windows applied when an entry is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    revalidate: Duration,
    stale_for: Duration,
}

impl TtlPolicy {
    /// Create a policy. The revalidate window must be shorter than the expiry.
    pub fn new(revalidate: Duration, stale_for: Duration) -> Result<Self> {
        if revalidate >= stale_for {
            return Err(Error::Config(format!(
                "revalidate window ({}s) must be shorter than stale-for duration ({}s)",
                revalidate.as_secs(),
                stale_for.as_secs()
            )));
        }
        Ok(Self {
            revalidate,
            stale_for,
        })
    }

    /// How long a fresh entry is served without revalidation.
    pub fn revalidate(&self) -> Duration {
        self.revalidate
    }

    /// How long an entry may be served at all.
    pub fn stale_for(&self) -> Duration {
        self.stale_for
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            revalidate: DEFAULT_REVALIDATE,
            stale_for: DEFAULT_STALE_FOR,
        }
    }
}

/// Cached artifact produced by the fetch+transform pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Document(Document),
    Listing(FileListing),
}

/// A cached payload with its deadlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Payload,
    /// Served without revalidation while `now < stale_at`.
    pub stale_at: DateTime<Utc>,
    /// Treated as absent once `now >= expires_at`.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry written at `now` under the given policy.
    pub fn new(
        key: impl Into<String>,
        payload: Payload,
        ttl: &TtlPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            payload,
            stale_at: offset(now, ttl.revalidate),
            expires_at: offset(now, ttl.stale_for),
        }
    }

    /// Check if the entry can be served without revalidation.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.stale_at
    }

    /// Check if the entry must no longer be served.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

fn offset(now: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Key-value persistence for cache entries.
///
/// Stores do not interpret deadlines; expiry is enforced by the SWR layer.
/// `put` replaces the whole entry so readers never observe a partial write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn put(&self, entry: CacheEntry) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Process-lifetime in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}

/// Store that keeps one JSON file per key under a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_seq: AtomicU64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(entry_file_name(key))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<CacheEntry>(&contents) {
            Ok(entry) if entry.key == key => Ok(Some(entry)),
            Ok(_) | Err(_) => {
                tracing::warn!(path = %path.display(), "discarding unreadable cache file");
                self.delete(key).await?;
                Ok(None)
            }
        }
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.root).await?;

        let path = self.entry_path(&entry.key);
        let json = serde_json::to_vec(&entry)?;

        // Write atomically via a per-write temp file
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("{}.tmp", seq));
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        remove_if_present(&self.entry_path(key)).await.map(|_| ())
    }

    /// Expired and unreadable entry files are removed; in-progress temp files are left alone.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let expired = match fs::read_to_string(&path).await {
                Ok(contents) => match serde_json::from_str::<CacheEntry>(&contents) {
                    Ok(entry) => entry.is_expired(now),
                    Err(_) => true,
                },
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if expired && remove_if_present(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Remove a file, reporting whether it existed.
async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::FileEntry;
    use tempfile::TempDir;

    fn listing_entry(key: &str, now: DateTime<Utc>) -> CacheEntry {
        let payload = Payload::Listing(FileListing {
            sha: "abc123".to_string(),
            files: vec![FileEntry {
                path: "README.md".to_string(),
                sha: "def456".to_string(),
            }],
        });
        CacheEntry::new(key, payload, &TtlPolicy::default(), now)
    }

    #[test]
    fn test_deadlines_ordered() {
        let now = Utc::now();
        let entry = listing_entry("files:a/b/main", now);

        assert!(entry.stale_at < entry.expires_at);
        assert_eq!(entry.stale_at - now, TimeDelta::minutes(5));
        assert_eq!(entry.expires_at - now, TimeDelta::days(2));
    }

    #[test]
    fn test_freshness_windows() {
        let now = Utc::now();
        let entry = listing_entry("files:a/b/main", now);

        assert!(entry.is_fresh(now));
        assert!(!entry.is_fresh(entry.stale_at));
        assert!(!entry.is_expired(entry.stale_at));
        assert!(entry.is_expired(entry.expires_at));
    }

    #[test]
    fn test_policy_rejects_inverted_windows() {
        let result = TtlPolicy::new(Duration::from_secs(60), Duration::from_secs(30));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let ttl = TtlPolicy::new(Duration::from_secs(1), Duration::MAX).unwrap();
        let entry = CacheEntry::new(
            "k",
            Payload::Listing(FileListing {
                sha: String::new(),
                files: vec![],
            }),
            &ttl,
            Utc::now(),
        );
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_memory_put_replaces() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.put(listing_entry("k", now)).await.unwrap();
        let mut replacement = listing_entry("k", now);
        if let Payload::Listing(listing) = &mut replacement.payload {
            listing.sha = "newsha".to_string();
        }
        store.put(replacement.clone()).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("k").await.unwrap(), Some(replacement));

        store.delete("k").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_purge_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..1000 {
            store
                .put(listing_entry(&format!("doc:o/r/main/{}.md", i), now - TimeDelta::days(30)))
                .await
                .unwrap();
        }
        store.put(listing_entry("files:o/r/main", now)).await.unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 1000);
        assert_eq!(store.len().await, 1);
        assert!(store.get("files:o/r/main").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_purge_expired() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let now = Utc::now();

        store.put(listing_entry("old", now - TimeDelta::days(3))).await.unwrap();
        store.put(listing_entry("fresh", now)).await.unwrap();
        std::fs::write(temp_dir.path().join(entry_file_name("broken")), "{").unwrap();
        std::fs::write(temp_dir.path().join("fresh.7.tmp"), "partial").unwrap();

        assert_eq!(store.purge_expired(now).await.unwrap(), 2);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("fresh").await.unwrap().is_some());
        assert!(temp_dir.path().join("fresh.7.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_purge_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("never-created"));

        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("entries"));
        let entry = listing_entry("files:owner/repo/main", Utc::now());

        store.put(entry.clone()).await.unwrap();

        let read = store.get("files:owner/repo/main").await.unwrap();
        assert_eq!(read, Some(entry));
    }

    #[tokio::test]
    async fn test_file_long_key_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let key = format!("doc:octo/docs/main/{}README.md", "docs/".repeat(42));
        assert!(key.len() > 200);
        let entry = listing_entry(&key, Utc::now());

        store.put(entry.clone()).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Some(entry));
        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert!(store.get("doc:missing").await.unwrap().is_none());
        store.delete("doc:missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_file_corrupt_entry_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let path = temp_dir.path().join(entry_file_name("doc:broken"));
        std::fs::write(&path, "{not json").unwrap();

        assert!(store.get("doc:broken").await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_no_temp_files_left() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.put(listing_entry("k1", Utc::now())).await.unwrap();
        store.put(listing_entry("k1", Utc::now())).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![entry_file_name("k1")]);
    }
}
