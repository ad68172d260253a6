use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display};

use super::GithubHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum ItemKind {
    #[strum(serialize = "PR")]
    PullRequest,
    #[strum(serialize = "Issue")]
    Issue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub full_id: String,
}

impl RepoInfo {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        let full_id = format!("{}/{}/{}", owner, repo, number);
        Self {
            owner,
            repo,
            number,
            full_id,
        }
    }
}

/// Snapshot of a pull request or issue as the munge loop sees it.
#[derive(Debug, Clone)]
pub struct ItemMetadata {
    pub repo_info: RepoInfo,
    pub kind: ItemKind,
    pub author: Option<GithubHandle>,
    pub assignees: Vec<GithubHandle>,
    pub labels: BTreeSet<String>,
    pub created: DateTime<Utc>,
    pub closed: bool,
}

impl ItemMetadata {
    pub fn is_pr(&self) -> bool {
        self.kind == ItemKind::PullRequest
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    pub fn users(&self) -> IssueUsers {
        IssueUsers {
            author: self.author.clone(),
            assignees: self.assignees.clone(),
        }
    }
}

/// People associated with an item: its author and its assignees.
#[derive(Debug, Clone, Default)]
pub struct IssueUsers {
    pub author: Option<GithubHandle>,
    pub assignees: Vec<GithubHandle>,
}

impl IssueUsers {
    pub fn all_users(&self) -> BTreeSet<&str> {
        self.author
            .iter()
            .chain(self.assignees.iter())
            .map(String::as_str)
            .filter(|login| !login.is_empty())
            .collect()
    }

    /// Space separated `@login` list, sorted and without duplicates.
    pub fn mention(&self) -> String {
        self.all_users()
            .into_iter()
            .map(|login| format!("@{login}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
