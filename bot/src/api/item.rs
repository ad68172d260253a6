use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use shared::{CommentRepr, IssueEvent, ItemMetadata};

use crate::mungers::MungeObject;

use super::GithubClient;

/// A tracked item backed by the GitHub API. In dry-run mode mutations are only
/// logged.
pub struct GithubItem {
    github: Arc<GithubClient>,
    item: ItemMetadata,
    dry_run: bool,
}

impl GithubItem {
    pub fn new(github: Arc<GithubClient>, item: ItemMetadata, dry_run: bool) -> Self {
        Self {
            github,
            item,
            dry_run,
        }
    }

    fn skip_mutation(&self, what: &str) -> bool {
        if self.dry_run {
            info!("Dry run: would {what} on {}", self.item.repo_info.full_id);
        }
        self.dry_run
    }
}

#[async_trait]
impl MungeObject for GithubItem {
    fn item(&self) -> &ItemMetadata {
        &self.item
    }

    async fn list_comments(&self) -> anyhow::Result<Vec<CommentRepr>> {
        self.github.list_comments(&self.item.repo_info).await
    }

    async fn list_review_comments(&self) -> anyhow::Result<Vec<CommentRepr>> {
        self.github.list_review_comments(&self.item.repo_info).await
    }

    async fn get_events(&self) -> anyhow::Result<Vec<IssueEvent>> {
        self.github.list_events(&self.item.repo_info).await
    }

    async fn write_comment(&self, text: &str) -> anyhow::Result<()> {
        if self.skip_mutation("comment") {
            return Ok(());
        }
        self.github.reply(&self.item.repo_info, text).await?;
        Ok(())
    }

    async fn delete_comment(&self, comment: &CommentRepr) -> anyhow::Result<()> {
        if self.skip_mutation(&format!("delete comment {}", comment.id)) {
            return Ok(());
        }
        self.github
            .delete_comment(&self.item.repo_info, comment.id)
            .await
    }

    async fn close_pr(&self) -> anyhow::Result<()> {
        if self.skip_mutation("close PR") {
            return Ok(());
        }
        self.github.close(&self.item.repo_info).await
    }

    async fn close_issue(&self, reason: &str) -> anyhow::Result<()> {
        if self.skip_mutation("close issue") {
            return Ok(());
        }
        if !reason.is_empty() {
            self.github.reply(&self.item.repo_info, reason).await?;
        }
        self.github.close(&self.item.repo_info).await
    }
}
