// GitHub resource types.
// Request coordinates, git tree responses, and the markdown file listing built from them.

use serde::{Deserialize, Serialize};

/// A repository at a branch, tag, or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub reference: String,
}

impl RepoRef {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            reference: reference.into(),
        }
    }

    /// Cache key for the markdown listing of this revision.
    pub fn listing_key(&self) -> String {
        format!("files:{}/{}/{}", self.owner, self.repo, self.reference)
    }
}

/// A single file within a repository revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    pub repo: RepoRef,
    pub path: String,
}

impl DocumentPath {
    pub fn new(repo: RepoRef, path: impl Into<String>) -> Self {
        Self {
            repo,
            path: path.into(),
        }
    }

    /// Cache key for the rendered document.
    pub fn cache_key(&self) -> String {
        format!(
            "doc:{}/{}/{}/{}",
            self.repo.owner, self.repo.repo, self.repo.reference, self.path
        )
    }
}

/// Git tree item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeItemType {
    Blob,
    Tree,
    Commit,
    #[serde(other)]
    Unknown,
}

/// Entry in a recursive git tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub item_type: TreeItemType,
    pub sha: String,
}

/// Response from the commits endpoint, reduced to the resolved commit.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    pub sha: String,
}

/// Response from the git trees endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

/// Markdown file found in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub sha: String,
}

/// Every markdown file at one revision, in tree order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub sha: String,
    pub files: Vec<FileEntry>,
}

impl FileListing {
    /// Markdown blobs of `tree`, labelled with the commit it was read at.
    pub fn from_tree(commit_sha: impl Into<String>, tree: TreeResponse) -> Self {
        let files = tree
            .tree
            .into_iter()
            .filter(|item| item.item_type == TreeItemType::Blob && is_markdown(&item.path))
            .map(|item| FileEntry {
                path: item.path,
                sha: item.sha,
            })
            .collect();

        Self {
            sha: commit_sha.into(),
            files,
        }
    }
}

/// Paths ending in `.md`, ignoring ASCII case.
pub fn is_markdown(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b".md")
}
