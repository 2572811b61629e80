// GitHub endpoint functions.
// Typed fetches of raw file contents and recursive git trees.

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{CommitResponse, DocumentPath, FileListing, RepoRef, TreeResponse};

const NO_PARAMS: &[(&str, &str)] = &[];

impl GitHubClient {
    /// Get the raw contents of a file.
    pub async fn get_raw_file(&self, doc: &DocumentPath) -> Result<String> {
        let repo = &doc.repo;
        let url = self.raw_url(
            [repo.owner.as_str(), repo.repo.as_str(), repo.reference.as_str()]
                .into_iter()
                .chain(doc.path.split('/')),
        )?;
        let response = self.get_raw(url).await?;
        let text = response.text().await?;
        Ok(text)
    }

    /// Resolve a branch, tag, or sha to the commit it names.
    pub async fn get_commit(&self, repo: &RepoRef) -> Result<CommitResponse> {
        let url = self.api_url([
            "repos",
            repo.owner.as_str(),
            repo.repo.as_str(),
            "commits",
            repo.reference.as_str(),
        ])?;
        let response = self.get_api(url, NO_PARAMS).await?;
        let commit: CommitResponse = response.json().await?;
        Ok(commit)
    }

    /// Get the recursive tree at a commit.
    pub async fn get_tree(&self, repo: &RepoRef, commit_sha: &str) -> Result<TreeResponse> {
        let url = self.api_url([
            "repos",
            repo.owner.as_str(),
            repo.repo.as_str(),
            "git",
            "trees",
            commit_sha,
        ])?;
        let response = self.get_api(url, &[("recursive", "1")]).await?;
        let tree: TreeResponse = response.json().await?;
        Ok(tree)
    }

    /// Get the markdown files of a revision, labelled with its commit sha.
    pub async fn get_markdown_listing(&self, repo: &RepoRef) -> Result<FileListing> {
        let commit = self.get_commit(repo).await?;
        let tree = self.get_tree(repo, &commit.sha).await?;
        if tree.truncated {
            tracing::warn!(
                owner = %repo.owner,
                repo = %repo.repo,
                commit = %commit.sha,
                "git tree truncated upstream, listing is partial"
            );
        }
        Ok(FileListing::from_tree(commit.sha, tree))
    }
}
