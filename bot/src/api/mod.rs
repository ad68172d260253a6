use std::sync::Arc;

use octocrab::models::{CommentId, IssueState, RateLimit};
use tracing::{info, instrument};

use shared::{
    github::{RawIssueEvent, RawReviewComment},
    CommentRepr, IssueEvent, ItemMetadata, RepoInfo,
};

mod item;
pub mod prometheus;

pub use item::GithubItem;

#[derive(Clone)]
pub struct GithubClient {
    octocrab: octocrab::Octocrab,
    prometheus: Arc<prometheus::PrometheusClient>,
    pub user_handle: String,
}

impl GithubClient {
    pub async fn new(
        github_token: String,
        prometheus: Arc<prometheus::PrometheusClient>,
    ) -> anyhow::Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(github_token)
            .build()?;
        let user_handle = octocrab.current().user().await?.login;

        Ok(Self {
            octocrab,
            user_handle,
            prometheus,
        })
    }

    /// Open pull requests and issues of a repository.
    #[instrument(skip(self))]
    pub async fn list_open_items(
        &self,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<Vec<ItemMetadata>> {
        let page = self
            .octocrab
            .issues(owner, repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100)
            .send()
            .await?;
        let issues = self.octocrab.all_pages(page).await?;

        info!("Found {} open items in {owner}/{repo}", issues.len());
        Ok(issues
            .into_iter()
            .map(|issue| ItemMetadata::from_issue(owner, repo, issue))
            .collect())
    }

    #[instrument(skip(self, repo_info), fields(item = %repo_info.full_id))]
    pub async fn list_comments(&self, repo_info: &RepoInfo) -> anyhow::Result<Vec<CommentRepr>> {
        let page = self
            .octocrab
            .issues(&repo_info.owner, &repo_info.repo)
            .list_comments(repo_info.number)
            .per_page(100)
            .send()
            .await?;
        let comments = self.octocrab.all_pages(page).await?;

        Ok(comments.into_iter().map(CommentRepr::from).collect())
    }

    #[instrument(skip(self, repo_info), fields(item = %repo_info.full_id))]
    pub async fn list_review_comments(
        &self,
        repo_info: &RepoInfo,
    ) -> anyhow::Result<Vec<CommentRepr>> {
        let route = format!(
            "/repos/{}/{}/pulls/{}/comments?per_page=100",
            repo_info.owner, repo_info.repo, repo_info.number
        );
        let page: octocrab::Page<RawReviewComment> =
            self.octocrab.get(route, None::<&()>).await?;
        let comments = self.octocrab.all_pages(page).await?;

        Ok(comments.into_iter().map(CommentRepr::from).collect())
    }

    #[instrument(skip(self, repo_info), fields(item = %repo_info.full_id))]
    pub async fn list_events(&self, repo_info: &RepoInfo) -> anyhow::Result<Vec<IssueEvent>> {
        let route = format!(
            "/repos/{}/{}/issues/{}/events?per_page=100",
            repo_info.owner, repo_info.repo, repo_info.number
        );
        let page: octocrab::Page<RawIssueEvent> = self.octocrab.get(route, None::<&()>).await?;
        let events = self.octocrab.all_pages(page).await?;

        Ok(events.into_iter().map(IssueEvent::from).collect())
    }

    #[instrument(skip(self, repo_info, text), fields(item = %repo_info.full_id))]
    pub async fn reply(&self, repo_info: &RepoInfo, text: &str) -> anyhow::Result<CommentRepr> {
        self.prometheus.add_write_request();
        let comment = self
            .octocrab
            .issues(&repo_info.owner, &repo_info.repo)
            .create_comment(repo_info.number, text)
            .await?;
        Ok(comment.into())
    }

    #[instrument(skip(self, repo_info), fields(item = %repo_info.full_id))]
    pub async fn delete_comment(
        &self,
        repo_info: &RepoInfo,
        comment_id: u64,
    ) -> anyhow::Result<()> {
        self.prometheus.add_write_request();
        self.octocrab
            .issues(&repo_info.owner, &repo_info.repo)
            .delete_comment(CommentId(comment_id))
            .await?;
        Ok(())
    }

    /// Closes an issue or a pull request; both share the issue state.
    #[instrument(skip(self, repo_info), fields(item = %repo_info.full_id))]
    pub async fn close(&self, repo_info: &RepoInfo) -> anyhow::Result<()> {
        self.prometheus.add_write_request();
        self.octocrab
            .issues(&repo_info.owner, &repo_info.repo)
            .update(repo_info.number)
            .state(IssueState::Closed)
            .send()
            .await?;
        Ok(())
    }

    pub async fn get_rate_limits(&self) -> anyhow::Result<RateLimit> {
        Ok(self.octocrab.ratelimit().get().await?)
    }
}
