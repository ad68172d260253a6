use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{CommentRepr, IssueEvent, ItemKind, ItemMetadata, RepoInfo};

impl ItemMetadata {
    pub fn from_issue(owner: &str, repo: &str, issue: octocrab::models::issues::Issue) -> Self {
        let kind = if issue.pull_request.is_some() {
            ItemKind::PullRequest
        } else {
            ItemKind::Issue
        };

        Self {
            repo_info: RepoInfo::new(owner, repo, issue.number),
            kind,
            author: Some(issue.user.login),
            assignees: issue.assignees.into_iter().map(|a| a.login).collect(),
            labels: issue
                .labels
                .into_iter()
                .map(|label| label.name)
                .collect::<BTreeSet<_>>(),
            created: issue.created_at,
            closed: issue.closed_at.is_some(),
        }
    }
}

impl From<octocrab::models::issues::Comment> for CommentRepr {
    fn from(comment: octocrab::models::issues::Comment) -> Self {
        Self {
            id: comment.id.0,
            user: Some(comment.user.login),
            created_at: Some(comment.created_at),
            updated_at: comment.updated_at,
            text: comment.body,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub login: Option<String>,
}

/// Review comment payload of `GET /repos/{owner}/{repo}/pulls/{number}/comments`.
/// Kept loose so malformed entries deserialize and get filtered later.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReviewComment {
    pub id: u64,
    pub user: Option<RawUser>,
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<RawReviewComment> for CommentRepr {
    fn from(comment: RawReviewComment) -> Self {
        Self {
            id: comment.id,
            user: comment.user.and_then(|u| u.login),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            text: comment.body,
        }
    }
}

/// Payload of `GET /repos/{owner}/{repo}/issues/{number}/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssueEvent {
    pub event: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<RawIssueEvent> for IssueEvent {
    fn from(event: RawIssueEvent) -> Self {
        Self {
            event: event.event,
            created_at: event.created_at,
        }
    }
}
